//! TOML-based application configuration.
//!
//! Stores operator settings including:
//! - The fixed UTC offset that defines "local" calendar days
//! - Sweep period and wall-clock alignment of the daily jobs
//! - Goal, quiz and leaderboard limits
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use chrono::{Duration, FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::ids::ChannelId;

/// Local time zone, as a fixed offset from UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimezoneConfig {
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

/// Periods and alignment of the background jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_daily_reset_at")]
    pub daily_reset_at: String,
    #[serde(default = "default_progress_report_at")]
    pub progress_report_at: String,
    #[serde(default = "default_quiz_broadcast_at")]
    pub quiz_broadcast_at: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default = "default_min_goal_minutes")]
    pub min_goal_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    #[serde(default = "default_validity_hours")]
    pub validity_hours: i64,
    /// Channels that receive the twice-daily quiz.
    #[serde(default)]
    pub broadcast_channels: Vec<ChannelId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    #[serde(default = "default_leaderboard_limit")]
    pub limit: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timezone: TimezoneConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

// Default functions
fn default_utc_offset_minutes() -> i32 {
    -5 * 60
}
fn default_poll_interval_secs() -> u64 {
    60
}
fn default_daily_reset_at() -> String {
    "00:00".into()
}
fn default_progress_report_at() -> String {
    "12:00".into()
}
fn default_quiz_broadcast_at() -> Vec<String> {
    vec!["08:00".into(), "20:00".into()]
}
fn default_min_goal_minutes() -> i64 {
    10
}
fn default_validity_hours() -> i64 {
    12
}
fn default_leaderboard_limit() -> usize {
    100
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            daily_reset_at: default_daily_reset_at(),
            progress_report_at: default_progress_report_at(),
            quiz_broadcast_at: default_quiz_broadcast_at(),
        }
    }
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            min_goal_minutes: default_min_goal_minutes(),
        }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            validity_hours: default_validity_hours(),
            broadcast_channels: Vec::new(),
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            limit: default_leaderboard_limit(),
        }
    }
}

/// Parse an `HH:MM` wall-clock time.
pub(crate) fn parse_wall_clock(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected HH:MM, got '{value}': {e}"),
    })
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without persisting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse
    /// into the field's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Check that every derived value (offset, wall-clock times) parses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.offset()?;
        self.daily_reset_at()?;
        self.progress_report_at()?;
        self.quiz_broadcast_at()?;
        let validity = self.quiz.validity_hours;
        if validity <= 0 || Duration::try_hours(validity).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "quiz.validity_hours".into(),
                message: format!("{validity} is out of range"),
            });
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scheduler.poll_interval_secs".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        self.timezone
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "timezone.utc_offset_minutes".into(),
                message: format!("{} is out of range", self.timezone.utc_offset_minutes),
            })
    }

    pub fn daily_reset_at(&self) -> Result<NaiveTime, ConfigError> {
        parse_wall_clock("scheduler.daily_reset_at", &self.scheduler.daily_reset_at)
    }

    pub fn progress_report_at(&self) -> Result<NaiveTime, ConfigError> {
        parse_wall_clock(
            "scheduler.progress_report_at",
            &self.scheduler.progress_report_at,
        )
    }

    pub fn quiz_broadcast_at(&self) -> Result<Vec<NaiveTime>, ConfigError> {
        self.scheduler
            .quiz_broadcast_at
            .iter()
            .map(|t| parse_wall_clock("scheduler.quiz_broadcast_at", t))
            .collect()
    }
}
