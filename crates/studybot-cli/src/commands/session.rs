use chrono::Utc;
use clap::Subcommand;
use studybot_core::{ChannelId, SessionLedger, UserId};

use super::{open, print_json, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start studying in a channel
    CheckIn {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        channel: ChannelId,
    },
    /// Stop studying and book the elapsed time
    CheckOut {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        channel: ChannelId,
    },
    /// Set the daily study goal
    Goal {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        channel: ChannelId,
        /// Goal in minutes
        #[arg(long)]
        minutes: i64,
    },
    /// Print the stored session as JSON
    Show {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        channel: ChannelId,
    },
}

pub fn run(action: SessionAction) -> CliResult {
    let (config, db) = open()?;
    let ledger = SessionLedger::new(&db, config.offset()?)
        .with_min_goal_minutes(config.study.min_goal_minutes);
    let now = Utc::now();

    match action {
        SessionAction::CheckIn { user, channel } => {
            print_json(&ledger.check_in(user, channel, now)?)?;
        }
        SessionAction::CheckOut { user, channel } => {
            let summary = ledger.check_out(user, channel, now)?;
            eprintln!("{}", summary.describe());
            print_json(&summary)?;
        }
        SessionAction::Goal {
            user,
            channel,
            minutes,
        } => {
            print_json(&ledger.set_goal(user, channel, minutes, now)?)?;
        }
        SessionAction::Show { user, channel } => match ledger.session(user, channel)? {
            Some(session) => print_json(&session)?,
            None => println!("null"),
        },
    }
    Ok(())
}
