//! Pomodoro timer documents, one row per user.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::database::{encode_ts, ts_column, Database};
use crate::error::Result;
use crate::ids::UserId;
use crate::timer::PomodoroTimer;

const TIMER_COLUMNS: &str =
    "user_id, start_time, study_time, break_time, cycles, current_cycle, on_break";

fn timer_from_row(row: &Row<'_>) -> rusqlite::Result<PomodoroTimer> {
    Ok(PomodoroTimer {
        user_id: row.get(0)?,
        start_time: ts_column(row, 1)?,
        study_time: row.get::<_, i64>(2)?.max(0) as u64,
        break_time: row.get::<_, i64>(3)?.max(0) as u64,
        cycles: row.get(4)?,
        current_cycle: row.get(5)?,
        on_break: row.get(6)?,
    })
}

impl Database {
    /// Store a timer, replacing any existing timer of the same user.
    ///
    /// Returns `true` if an older timer was replaced.
    pub fn upsert_timer(&self, timer: &PomodoroTimer) -> Result<bool> {
        let existed = self.timer(timer.user_id)?.is_some();
        self.conn().execute(
            "INSERT OR REPLACE INTO pomodoro_timers
                (user_id, start_time, study_time, break_time, cycles, current_cycle, on_break)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                timer.user_id,
                encode_ts(&timer.start_time),
                timer.study_time as i64,
                timer.break_time as i64,
                timer.cycles,
                timer.current_cycle,
                timer.on_break,
            ],
        )?;
        Ok(existed)
    }

    pub fn timer(&self, user: UserId) -> Result<Option<PomodoroTimer>> {
        let sql = format!("SELECT {TIMER_COLUMNS} FROM pomodoro_timers WHERE user_id = ?1");
        Ok(self
            .conn()
            .query_row(&sql, params![user], timer_from_row)
            .optional()?)
    }

    pub fn timers(&self) -> Result<Vec<PomodoroTimer>> {
        let sql = format!("SELECT {TIMER_COLUMNS} FROM pomodoro_timers ORDER BY start_time");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], timer_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete a user's timer. Returns whether one existed.
    pub fn delete_timer(&self, user: UserId) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM pomodoro_timers WHERE user_id = ?1", params![user])?;
        Ok(changed == 1)
    }

    /// Delete the timer only if it is still the run that started at `start_time`.
    pub fn delete_timer_if(&self, user: UserId, start_time: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn().execute(
            "DELETE FROM pomodoro_timers WHERE user_id = ?1 AND start_time = ?2",
            params![user, encode_ts(&start_time)],
        )?;
        Ok(changed == 1)
    }

    /// Persist a phase change, guarded on `start_time` like [`Self::delete_timer_if`].
    pub fn update_timer_phase(
        &self,
        user: UserId,
        start_time: DateTime<Utc>,
        current_cycle: u32,
        on_break: bool,
    ) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE pomodoro_timers SET current_cycle = ?3, on_break = ?4
              WHERE user_id = ?1 AND start_time = ?2",
            params![user, encode_ts(&start_time), current_cycle, on_break],
        )?;
        Ok(changed == 1)
    }
}
