use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::format::format_minutes;
use super::StudySession;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::ids::{ChannelId, UserId};
use crate::storage::Database;

/// Smallest daily goal accepted unless configured otherwise.
pub const DEFAULT_MIN_GOAL_MINUTES: i64 = 10;

/// Progress toward the daily goal right after a check-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal_secs: i64,
    pub studied_today: f64,
}

impl GoalProgress {
    pub fn reached(&self) -> bool {
        self.studied_today >= self.goal_secs as f64
    }

    /// Seconds still missing; negative once the goal is exceeded.
    pub fn remaining(&self) -> f64 {
        self.goal_secs as f64 - self.studied_today
    }
}

/// Outcome of a successful check-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutSummary {
    pub user: UserId,
    pub channel: ChannelId,
    pub elapsed_secs: f64,
    pub daily_study_time: f64,
    pub total_study_time: f64,
    pub goal: Option<GoalProgress>,
    pub at: DateTime<Utc>,
}

impl CheckOutSummary {
    pub fn event(&self) -> Event {
        Event::CheckedOut {
            user: self.user,
            channel: self.channel,
            elapsed_secs: self.elapsed_secs,
            daily_study_time: self.daily_study_time,
            at: self.at,
        }
    }

    /// User-facing confirmation text.
    pub fn describe(&self) -> String {
        let mention = self.user.mention();
        match self.goal {
            None => format!("{mention} checked out!"),
            Some(goal) if goal.reached() => format!(
                "{mention} checked out and reached their study goal for today! Congratulations! \
                 {mention} has focused **{}** minutes today!",
                format_minutes(goal.studied_today)
            ),
            Some(goal) => format!(
                "{mention} checked out and is **{}** minutes away from their study goal. \
                 {mention} has focused **{}** minutes today!",
                format_minutes(goal.remaining()),
                format_minutes(goal.studied_today)
            ),
        }
    }
}

/// Check-in/check-out bookkeeping per (user, channel).
pub struct SessionLedger<'a> {
    db: &'a Database,
    offset: FixedOffset,
    min_goal_minutes: i64,
}

impl<'a> SessionLedger<'a> {
    /// `offset` decides which calendar date a check-out is booked on.
    pub fn new(db: &'a Database, offset: FixedOffset) -> Self {
        Self {
            db,
            offset,
            min_goal_minutes: DEFAULT_MIN_GOAL_MINUTES,
        }
    }

    pub fn with_min_goal_minutes(mut self, minutes: i64) -> Self {
        self.min_goal_minutes = minutes;
        self
    }

    pub fn session(&self, user: UserId, channel: ChannelId) -> Result<Option<StudySession>> {
        self.db.session(user, channel)
    }

    /// Start a study session.
    ///
    /// # Errors
    /// `AlreadyCheckedIn` if a session is already open for this (user, channel).
    pub fn check_in(&self, user: UserId, channel: ChannelId, now: DateTime<Utc>) -> Result<Event> {
        if !self.db.open_check_in(user, channel, now)? {
            return Err(CoreError::AlreadyCheckedIn);
        }
        tracing::info!(user = %user, channel = %channel, "checked in");
        Ok(Event::CheckedIn {
            user,
            channel,
            at: now,
        })
    }

    /// Close the open session and book the elapsed time.
    ///
    /// # Errors
    /// `NotCheckedIn` if there is no open session.
    pub fn check_out(
        &self,
        user: UserId,
        channel: ChannelId,
        now: DateTime<Utc>,
    ) -> Result<CheckOutSummary> {
        let session = self.db.session(user, channel)?.ok_or(CoreError::NotCheckedIn)?;
        let checked_in_at = session.check_in_time.ok_or(CoreError::NotCheckedIn)?;

        let elapsed = ((now - checked_in_at).num_milliseconds() as f64 / 1000.0).max(0.0);
        if !self.db.close_check_in(user, channel, checked_in_at, elapsed)? {
            // A concurrent check-out won the race.
            return Err(CoreError::NotCheckedIn);
        }

        let today = now.with_timezone(&self.offset).date_naive();
        self.db.add_daily_study(user, channel, today, elapsed)?;

        let daily_study_time = session.daily_study_time + elapsed;
        let summary = CheckOutSummary {
            user,
            channel,
            elapsed_secs: elapsed,
            daily_study_time,
            total_study_time: session.total_study_time + elapsed,
            goal: session.goal.map(|goal_secs| GoalProgress {
                goal_secs,
                studied_today: daily_study_time,
            }),
            at: now,
        };
        tracing::info!(user = %user, channel = %channel, elapsed, "checked out");
        Ok(summary)
    }

    /// Set the daily goal in minutes, replacing any previous goal.
    ///
    /// # Errors
    /// `GoalTooSmall` below the configured minimum.
    pub fn set_goal(
        &self,
        user: UserId,
        channel: ChannelId,
        minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Event> {
        if minutes < self.min_goal_minutes {
            return Err(CoreError::GoalTooSmall {
                minutes,
                min: self.min_goal_minutes,
            });
        }
        let goal_secs = minutes * 60;
        self.db.set_goal(user, channel, goal_secs)?;
        Ok(Event::GoalSet {
            user,
            channel,
            goal_secs,
            at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn check_out_without_check_in_fails() {
        let db = Database::open_memory().unwrap();
        let ledger = SessionLedger::new(&db, utc());
        let err = ledger.check_out(UserId(1), ChannelId(1), t0()).unwrap_err();
        assert!(matches!(err, CoreError::NotCheckedIn));
    }

    #[test]
    fn goal_progress_reports_remaining() {
        let db = Database::open_memory().unwrap();
        let ledger = SessionLedger::new(&db, utc());
        ledger.set_goal(UserId(1), ChannelId(1), 30, t0()).unwrap();
        ledger.check_in(UserId(1), ChannelId(1), t0()).unwrap();
        let summary = ledger
            .check_out(UserId(1), ChannelId(1), t0() + Duration::minutes(20))
            .unwrap();
        let goal = summary.goal.unwrap();
        assert!(!goal.reached());
        assert_eq!(goal.remaining(), 600.0);
        assert!(summary.describe().contains("**10.00** minutes away"));
    }

    #[test]
    fn goal_reached_when_daily_time_meets_goal() {
        let db = Database::open_memory().unwrap();
        let ledger = SessionLedger::new(&db, utc());
        ledger.set_goal(UserId(1), ChannelId(1), 10, t0()).unwrap();
        ledger.check_in(UserId(1), ChannelId(1), t0()).unwrap();
        let summary = ledger
            .check_out(UserId(1), ChannelId(1), t0() + Duration::minutes(10))
            .unwrap();
        assert!(summary.goal.unwrap().reached());
        assert!(summary.describe().contains("reached their study goal"));
    }

    #[test]
    fn min_goal_is_configurable() {
        let db = Database::open_memory().unwrap();
        let ledger = SessionLedger::new(&db, utc()).with_min_goal_minutes(20);
        assert!(ledger.set_goal(UserId(1), ChannelId(1), 15, t0()).is_err());
        assert!(ledger.set_goal(UserId(1), ChannelId(1), 20, t0()).is_ok());
    }

    #[test]
    fn check_out_is_booked_on_local_date() {
        let db = Database::open_memory().unwrap();
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let ledger = SessionLedger::new(&db, eastern);
        // 02:00 UTC is still the previous evening in UTC-5.
        let start = Utc.with_ymd_and_hms(2024, 5, 7, 1, 0, 0).unwrap();
        ledger.check_in(UserId(1), ChannelId(1), start).unwrap();
        ledger
            .check_out(UserId(1), ChannelId(1), start + Duration::hours(1))
            .unwrap();
        let may6 = chrono::NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let rec = db.daily_record(UserId(1), ChannelId(1), may6).unwrap().unwrap();
        assert_eq!(rec.study_time_this_day, 3600.0);
    }
}
