use chrono::Utc;
use clap::Subcommand;
use studybot_core::{format_duration, Aggregator, ChannelId, LeaderboardScope, UserId};

use super::{open, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Level, XP and daily/weekly/all-time study time
    Report {
        #[arg(long)]
        user: UserId,
    },
    /// Recompute and print the level cache
    Level {
        #[arg(long)]
        user: UserId,
    },
    /// Top users by total study time
    Leaderboard {
        /// Restrict to one channel (server-wide otherwise)
        #[arg(long)]
        channel: Option<ChannelId>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Zero the daily counters now
    ResetDaily,
}

pub fn run(action: StatsAction) -> CliResult {
    let (config, db) = open()?;
    let aggregator = Aggregator::new(&db, config.offset()?);
    let now = Utc::now();

    match action {
        StatsAction::Report { user } => match aggregator.report(user, now)? {
            Some(report) => {
                eprintln!("{}", report.describe());
                print_json(&report)?;
            }
            None => {
                eprintln!("You have not studied yet.");
                println!("null");
            }
        },
        StatsAction::Level { user } => {
            print_json(&aggregator.compute_level(user, now)?)?;
        }
        StatsAction::Leaderboard { channel, limit } => {
            let scope = match channel {
                Some(channel) => LeaderboardScope::Channel(channel),
                None => LeaderboardScope::Server,
            };
            let entries =
                aggregator.leaderboard(scope, limit.unwrap_or(config.leaderboard.limit))?;
            for (rank, entry) in entries.iter().enumerate() {
                eprintln!(
                    "{}. {}: {}",
                    rank + 1,
                    entry.user.mention(),
                    format_duration(entry.total_study_time as u64)
                );
            }
            print_json(&entries)?;
        }
        StatsAction::ResetDaily => {
            print_json(&aggregator.daily_reset(now)?)?;
        }
    }
    Ok(())
}
