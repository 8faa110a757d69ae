//! Daily/weekly roll-ups, the level cache, leaderboards and reports.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::format::format_duration;
use super::UserLevel;
use crate::error::Result;
use crate::events::Event;
use crate::ids::{ChannelId, UserId};
use crate::platform::{notify_user, Notice, Platform};
use crate::storage::Database;

/// XP for cumulative study seconds and correct quiz answers.
pub fn xp_for(total_study_secs: f64, correct_answers: u64) -> f64 {
    (total_study_secs / 60.0) * 0.5 + correct_answers as f64 * 50.0
}

pub fn level_for(xp: f64) -> u32 {
    (xp.max(0.0) / 50.0).sqrt().floor() as u32
}

/// Monday and Sunday of the local week containing `now`.
pub fn week_bounds(now: DateTime<Utc>, offset: FixedOffset) -> (NaiveDate, NaiveDate) {
    let today = now.with_timezone(&offset).date_naive();
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(6))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardScope {
    Channel(ChannelId),
    Server,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user: UserId,
    pub total_study_time: f64,
}

/// Everything shown by the personal report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyReport {
    pub user: UserId,
    pub level: u32,
    pub xp: f64,
    pub daily_study_time: f64,
    pub weekly_study_time: f64,
    pub total_study_time: f64,
}

impl StudyReport {
    pub fn describe(&self) -> String {
        format!(
            "LEVEL: **{}**  |  XP: **{}**\nDAILY: {}\nWEEKLY: {}\nALL TIME: {}\n",
            self.level,
            self.xp as i64,
            format_duration(self.daily_study_time as u64),
            format_duration(self.weekly_study_time as u64),
            format_duration(self.total_study_time as u64),
        )
    }
}

pub struct Aggregator<'a> {
    db: &'a Database,
    offset: FixedOffset,
}

impl<'a> Aggregator<'a> {
    pub fn new(db: &'a Database, offset: FixedOffset) -> Self {
        Self { db, offset }
    }

    /// Zero every session's daily counter and seed today's per-date records.
    /// Cumulative totals and open check-ins are untouched.
    pub fn daily_reset(&self, now: DateTime<Utc>) -> Result<Event> {
        let sessions = self.db.reset_daily_study_time()?;
        let today = now.with_timezone(&self.offset).date_naive();
        let records = self.db.seed_daily_records(today)?;
        tracing::info!(sessions, records, date = %today, "daily study time reset");
        Ok(Event::DailyReset {
            sessions,
            records,
            at: now,
        })
    }

    /// Sum of a user's per-day study time over the inclusive range.
    pub fn weekly_total(&self, user: UserId, week_start: NaiveDate, week_end: NaiveDate) -> Result<f64> {
        self.db.study_time_between(user, week_start, week_end)
    }

    /// Recompute and store the level cache from the ledger and answer history.
    pub fn compute_level(&self, user: UserId, now: DateTime<Utc>) -> Result<UserLevel> {
        let total: f64 = self
            .db
            .sessions_for_user(user)?
            .iter()
            .map(|s| s.total_study_time)
            .sum();
        let correct = self.db.correct_answer_count(user)?;
        let xp = xp_for(total, correct);
        let level = UserLevel {
            user_id: user,
            xp,
            level: level_for(xp),
        };
        self.db.upsert_user_level(&level, now)?;
        tracing::debug!(user = %user, xp, level = level.level, "level computed");
        Ok(level)
    }

    /// Personal report across all channels. `None` if the user never studied.
    pub fn report(&self, user: UserId, now: DateTime<Utc>) -> Result<Option<StudyReport>> {
        let sessions = self.db.sessions_for_user(user)?;
        if sessions.is_empty() {
            return Ok(None);
        }
        let level = self.compute_level(user, now)?;
        let (monday, sunday) = week_bounds(now, self.offset);
        Ok(Some(StudyReport {
            user,
            level: level.level,
            xp: level.xp,
            daily_study_time: sessions.iter().map(|s| s.daily_study_time).sum(),
            weekly_study_time: self.weekly_total(user, monday, sunday)?,
            total_study_time: sessions.iter().map(|s| s.total_study_time).sum(),
        }))
    }

    pub fn leaderboard(&self, scope: LeaderboardScope, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let rows = match scope {
            LeaderboardScope::Channel(channel) => self.db.channel_ranking(channel, limit)?,
            LeaderboardScope::Server => self.db.server_ranking(limit)?,
        };
        Ok(rows
            .into_iter()
            .map(|(user, total_study_time)| LeaderboardEntry {
                user,
                total_study_time,
            })
            .collect())
    }

    /// Privately send every current member their all-time study total.
    pub fn send_progress_reports(&self, platform: &dyn Platform, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for (user, total) in self.db.user_totals()? {
            match platform.member(user) {
                Ok(Some(_)) => {}
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(user = %user, "member lookup failed: {e}");
                    continue;
                }
            }
            let notice = Notice::text(format!(
                "Your total study time is: {}",
                format_duration(total as u64)
            ));
            match notify_user(platform, user, &notice, now) {
                Some(failed) => events.push(failed),
                None => {
                    tracing::info!(user = %user, "sent progress report");
                    events.push(Event::ProgressReported {
                        user,
                        total_study_time: total,
                        at: now,
                    });
                }
            }
        }
        Ok(events)
    }
}
