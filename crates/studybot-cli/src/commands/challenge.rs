use chrono::Utc;
use clap::Subcommand;
use studybot_core::{ChallengeEngine, ChannelId, UserId};

use super::{open, print_json, CliResult};
use crate::console::ConsolePlatform;

#[derive(Subcommand)]
pub enum ChallengeAction {
    /// Start a challenge from a channel
    Start {
        /// Channel the challenge is started from
        #[arg(long)]
        channel: ChannelId,
        /// Duration in minutes
        #[arg(long)]
        duration: i64,
        /// Participant user ids
        #[arg(long, num_args = 1.., required = true)]
        participants: Vec<UserId>,
    },
    /// List running challenges
    List,
    /// Tear down expired challenges now
    Sweep,
}

pub fn run(action: ChallengeAction) -> CliResult {
    let (config, db) = open()?;
    let platform = ConsolePlatform;
    let engine = ChallengeEngine::new(&db, &platform, config.offset()?);
    let now = Utc::now();

    match action {
        ChallengeAction::Start {
            channel,
            duration,
            participants,
        } => {
            print_json(&engine.start_challenge(channel, duration, &participants, now)?)?;
        }
        ChallengeAction::List => {
            print_json(&engine.challenges()?)?;
        }
        ChallengeAction::Sweep => {
            print_json(&engine.sweep(now)?)?;
        }
    }
    Ok(())
}
