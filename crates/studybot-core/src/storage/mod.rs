mod challenges;
mod config;
pub mod database;
pub mod migrations;
mod quizzes;
mod sessions;
mod timers;

pub use config::{
    Config, LeaderboardConfig, QuizConfig, SchedulerConfig, StudyConfig, TimezoneConfig,
};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the studybot data directory, creating it if needed.
///
/// `STUDYBOT_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/studybot`, or `~/.config/studybot-dev` when `STUDYBOT_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STUDYBOT_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("STUDYBOT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studybot-dev")
            } else {
                base_dir.join("studybot")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
