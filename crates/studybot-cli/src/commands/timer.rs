use chrono::Utc;
use clap::Subcommand;
use studybot_core::{PomodoroEngine, UserId};

use super::{open, print_json, CliResult};
use crate::console::ConsolePlatform;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a Pomodoro timer, replacing any running one
    Start {
        #[arg(long)]
        user: UserId,
        /// Study phase in minutes
        #[arg(long, default_value = "25")]
        study: u64,
        /// Break phase in minutes
        #[arg(long = "break", default_value = "5")]
        break_minutes: u64,
        #[arg(long, default_value = "4")]
        cycles: u32,
    },
    /// Stop the user's timer
    Stop {
        #[arg(long)]
        user: UserId,
    },
    /// Print the user's timer as JSON
    Status {
        #[arg(long)]
        user: UserId,
    },
    /// Run one sweep over all timers now
    Sweep,
}

pub fn run(action: TimerAction) -> CliResult {
    let (_config, db) = open()?;
    let platform = ConsolePlatform;
    let engine = PomodoroEngine::new(&db, &platform);
    let now = Utc::now();

    match action {
        TimerAction::Start {
            user,
            study,
            break_minutes,
            cycles,
        } => {
            let study_secs = study.checked_mul(60).ok_or("--study is out of range")?;
            let break_secs = break_minutes.checked_mul(60).ok_or("--break is out of range")?;
            print_json(&engine.start(user, study_secs, break_secs, cycles, now)?)?;
        }
        TimerAction::Stop { user } => {
            print_json(&engine.stop(user, now)?)?;
        }
        TimerAction::Status { user } => match engine.timer(user)? {
            Some(timer) => print_json(&serde_json::json!({
                "timer": timer,
                "phase": timer.phase(),
                "elapsed_secs": timer.elapsed_secs(now),
            }))?,
            None => println!("null"),
        },
        TimerAction::Sweep => {
            print_json(&engine.sweep(now)?)?;
        }
    }
    Ok(())
}
