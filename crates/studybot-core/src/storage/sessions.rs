//! Study session, daily record and level-cache documents.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::database::{encode_ts, opt_ts_column, Database};
use crate::error::Result;
use crate::ids::{ChannelId, UserId};
use crate::session::{DailyStudyRecord, StudySession, UserLevel};

const SESSION_COLUMNS: &str =
    "user_id, channel_id, check_in_time, total_study_time, daily_study_time, goal";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<StudySession> {
    Ok(StudySession {
        user_id: row.get(0)?,
        channel_id: row.get(1)?,
        check_in_time: opt_ts_column(row, 2)?,
        total_study_time: row.get(3)?,
        daily_study_time: row.get(4)?,
        goal: row.get(5)?,
    })
}

fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl Database {
    pub fn session(&self, user: UserId, channel: ChannelId) -> Result<Option<StudySession>> {
        let sql =
            format!("SELECT {SESSION_COLUMNS} FROM study_sessions WHERE user_id = ?1 AND channel_id = ?2");
        let session = self
            .conn()
            .query_row(&sql, params![user, channel], session_from_row)
            .optional()?;
        Ok(session)
    }

    pub fn sessions_for_user(&self, user: UserId) -> Result<Vec<StudySession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions WHERE user_id = ?1 ORDER BY channel_id"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![user], session_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Set `check_in_time` only if it is currently absent.
    ///
    /// Returns `false` when the session was already checked in.
    pub fn open_check_in(&self, user: UserId, channel: ChannelId, at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn().execute(
            "INSERT INTO study_sessions (user_id, channel_id, check_in_time)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id, channel_id) DO UPDATE
                SET check_in_time = excluded.check_in_time
                WHERE study_sessions.check_in_time IS NULL",
            params![user, channel, encode_ts(&at)],
        )?;
        Ok(changed == 1)
    }

    /// Clear the check-in and add `elapsed` seconds to both counters, but
    /// only if the stored check-in is still the one that was read.
    ///
    /// Returns `false` if another writer closed the session first.
    pub fn close_check_in(
        &self,
        user: UserId,
        channel: ChannelId,
        checked_in_at: DateTime<Utc>,
        elapsed: f64,
    ) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE study_sessions
                SET total_study_time = total_study_time + ?3,
                    daily_study_time = daily_study_time + ?3,
                    check_in_time = NULL
              WHERE user_id = ?1 AND channel_id = ?2 AND check_in_time = ?4",
            params![user, channel, elapsed, encode_ts(&checked_in_at)],
        )?;
        Ok(changed == 1)
    }

    pub fn set_goal(&self, user: UserId, channel: ChannelId, goal_secs: i64) -> Result<()> {
        self.conn().execute(
            "INSERT INTO study_sessions (user_id, channel_id, goal)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id, channel_id) DO UPDATE SET goal = excluded.goal",
            params![user, channel, goal_secs],
        )?;
        Ok(())
    }

    /// Zero `daily_study_time` on every session. Returns the number touched.
    pub fn reset_daily_study_time(&self) -> Result<usize> {
        Ok(self
            .conn()
            .execute("UPDATE study_sessions SET daily_study_time = 0", [])?)
    }

    pub fn add_daily_study(
        &self,
        user: UserId,
        channel: ChannelId,
        date: NaiveDate,
        secs: f64,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO daily_study (user_id, channel_id, date, study_time)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, channel_id, date) DO UPDATE
                SET study_time = study_time + excluded.study_time",
            params![user, channel, encode_date(date), secs],
        )?;
        Ok(())
    }

    /// Seed an empty record for `date` for every known (user, channel).
    /// Time already booked on `date` is kept. Returns the rows created.
    pub fn seed_daily_records(&self, date: NaiveDate) -> Result<usize> {
        Ok(self.conn().execute(
            "INSERT INTO daily_study (user_id, channel_id, date, study_time)
             SELECT user_id, channel_id, ?1, 0 FROM study_sessions WHERE true
             ON CONFLICT (user_id, channel_id, date) DO NOTHING",
            params![encode_date(date)],
        )?)
    }

    pub fn daily_record(
        &self,
        user: UserId,
        channel: ChannelId,
        date: NaiveDate,
    ) -> Result<Option<DailyStudyRecord>> {
        let study_time: Option<f64> = self
            .conn()
            .query_row(
                "SELECT study_time FROM daily_study
                  WHERE user_id = ?1 AND channel_id = ?2 AND date = ?3",
                params![user, channel, encode_date(date)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(study_time.map(|study_time_this_day| DailyStudyRecord {
            user_id: user,
            channel_id: channel,
            date,
            study_time_this_day,
        }))
    }

    /// Sum of a user's per-day records over the inclusive date range.
    pub fn study_time_between(&self, user: UserId, start: NaiveDate, end: NaiveDate) -> Result<f64> {
        Ok(self.conn().query_row(
            "SELECT COALESCE(SUM(study_time), 0) FROM daily_study
              WHERE user_id = ?1 AND date >= ?2 AND date <= ?3",
            params![user, encode_date(start), encode_date(end)],
            |row| row.get(0),
        )?)
    }

    /// Top sessions of one channel by cumulative study time.
    pub fn channel_ranking(&self, channel: ChannelId, limit: usize) -> Result<Vec<(UserId, f64)>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, total_study_time FROM study_sessions
              WHERE channel_id = ?1
              ORDER BY total_study_time DESC, user_id
              LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![channel, limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Users ranked by study time summed across all channels.
    pub fn server_ranking(&self, limit: usize) -> Result<Vec<(UserId, f64)>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, SUM(total_study_time) AS total FROM study_sessions
              GROUP BY user_id
              ORDER BY total DESC, user_id
              LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every user with at least one session, with their summed total.
    pub fn user_totals(&self) -> Result<Vec<(UserId, f64)>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, SUM(total_study_time) FROM study_sessions
              GROUP BY user_id ORDER BY user_id",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn upsert_user_level(&self, level: &UserLevel, at: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "INSERT INTO user_levels (user_id, xp, level, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE
                SET xp = excluded.xp, level = excluded.level, updated_at = excluded.updated_at",
            params![level.user_id, level.xp, level.level, encode_ts(&at)],
        )?;
        Ok(())
    }

    pub fn user_level(&self, user: UserId) -> Result<Option<UserLevel>> {
        let level = self
            .conn()
            .query_row(
                "SELECT user_id, xp, level FROM user_levels WHERE user_id = ?1",
                params![user],
                |row| {
                    Ok(UserLevel {
                        user_id: row.get(0)?,
                        xp: row.get(1)?,
                        level: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
    }

    #[test]
    fn open_check_in_is_exclusive() {
        let db = Database::open_memory().unwrap();
        assert!(db.open_check_in(UserId(1), ChannelId(2), at(9, 0)).unwrap());
        assert!(!db.open_check_in(UserId(1), ChannelId(2), at(9, 5)).unwrap());
        let s = db.session(UserId(1), ChannelId(2)).unwrap().unwrap();
        assert_eq!(s.check_in_time, Some(at(9, 0)));
    }

    #[test]
    fn close_check_in_requires_matching_timestamp() {
        let db = Database::open_memory().unwrap();
        db.open_check_in(UserId(1), ChannelId(2), at(9, 0)).unwrap();
        assert!(!db
            .close_check_in(UserId(1), ChannelId(2), at(9, 0) + Duration::seconds(1), 60.0)
            .unwrap());
        assert!(db.close_check_in(UserId(1), ChannelId(2), at(9, 0), 60.0).unwrap());
        assert!(!db.close_check_in(UserId(1), ChannelId(2), at(9, 0), 60.0).unwrap());

        let s = db.session(UserId(1), ChannelId(2)).unwrap().unwrap();
        assert_eq!(s.total_study_time, 60.0);
        assert_eq!(s.daily_study_time, 60.0);
        assert!(s.check_in_time.is_none());
    }

    #[test]
    fn set_goal_keeps_counters() {
        let db = Database::open_memory().unwrap();
        db.open_check_in(UserId(1), ChannelId(2), at(9, 0)).unwrap();
        db.set_goal(UserId(1), ChannelId(2), 600).unwrap();
        db.set_goal(UserId(1), ChannelId(2), 1200).unwrap();
        let s = db.session(UserId(1), ChannelId(2)).unwrap().unwrap();
        assert_eq!(s.goal, Some(1200));
        assert!(s.is_checked_in());
    }

    #[test]
    fn daily_records_accumulate_and_seed_keeps_booked_time() {
        let db = Database::open_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        db.set_goal(UserId(1), ChannelId(2), 600).unwrap();
        db.add_daily_study(UserId(1), ChannelId(2), day, 30.0).unwrap();
        db.add_daily_study(UserId(1), ChannelId(2), day, 45.5).unwrap();
        let rec = db.daily_record(UserId(1), ChannelId(2), day).unwrap().unwrap();
        assert_eq!(rec.study_time_this_day, 75.5);

        assert_eq!(db.seed_daily_records(day).unwrap(), 0);
        let rec = db.daily_record(UserId(1), ChannelId(2), day).unwrap().unwrap();
        assert_eq!(rec.study_time_this_day, 75.5);

        let next = day.succ_opt().unwrap();
        assert_eq!(db.seed_daily_records(next).unwrap(), 1);
        let rec = db.daily_record(UserId(1), ChannelId(2), next).unwrap().unwrap();
        assert_eq!(rec.study_time_this_day, 0.0);
    }

    #[test]
    fn rankings_sort_descending() {
        let db = Database::open_memory().unwrap();
        for (user, channel, secs) in [(1, 10, 100.0), (2, 10, 300.0), (1, 11, 500.0)] {
            db.open_check_in(UserId(user), ChannelId(channel), at(8, 0)).unwrap();
            db.close_check_in(UserId(user), ChannelId(channel), at(8, 0), secs)
                .unwrap();
        }
        assert_eq!(
            db.channel_ranking(ChannelId(10), 10).unwrap(),
            vec![(UserId(2), 300.0), (UserId(1), 100.0)]
        );
        assert_eq!(
            db.server_ranking(1).unwrap(),
            vec![(UserId(1), 600.0)]
        );
    }
}
