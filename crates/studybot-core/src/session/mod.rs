//! Study session ledger and its daily/weekly roll-ups.
//!
//! A session is keyed by (user, channel). `check_in_time` is present only
//! while the user is studying; check-out folds the elapsed time into the
//! cumulative and daily counters and into the per-date record.

mod aggregate;
mod format;
mod ledger;

pub use aggregate::{
    level_for, week_bounds, xp_for, Aggregator, LeaderboardEntry, LeaderboardScope, StudyReport,
};
pub use format::{format_duration, format_minutes};
pub use ledger::{CheckOutSummary, GoalProgress, SessionLedger};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, UserId};

/// Check-in state and accumulated time for one (user, channel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub check_in_time: Option<DateTime<Utc>>,
    /// Cumulative seconds, never decreases.
    pub total_study_time: f64,
    /// Seconds since the last daily reset.
    pub daily_study_time: f64,
    /// Daily target in seconds.
    pub goal: Option<i64>,
}

impl StudySession {
    pub fn is_checked_in(&self) -> bool {
        self.check_in_time.is_some()
    }
}

/// Seconds studied by one (user, channel) on one local calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStudyRecord {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub date: NaiveDate,
    pub study_time_this_day: f64,
}

/// Cached gamification score. Always recomputable from the ledger and the
/// answer history; never incremented on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLevel {
    pub user_id: UserId,
    pub xp: f64,
    pub level: u32,
}
