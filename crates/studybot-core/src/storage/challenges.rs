//! Challenge documents. Participants are a JSON array of user ids.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::database::{encode_ts, json_column, ts_column, Database};
use crate::challenge::Challenge;
use crate::error::Result;
use crate::ids::UserId;

const CHALLENGE_COLUMNS: &str =
    "id, channel_id, original_channel_id, message_id, end_time, participants";

fn challenge_from_row(row: &Row<'_>) -> rusqlite::Result<Challenge> {
    Ok(Challenge {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        original_channel_id: row.get(2)?,
        message_id: row.get(3)?,
        end_time: ts_column(row, 4)?,
        participants: json_column(row, 5)?,
    })
}

impl Database {
    pub fn insert_challenge(&self, challenge: &Challenge) -> Result<()> {
        self.conn().execute(
            "INSERT INTO challenges
                (id, channel_id, original_channel_id, message_id, end_time, participants)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                challenge.id,
                challenge.channel_id,
                challenge.original_channel_id,
                challenge.message_id,
                encode_ts(&challenge.end_time),
                serde_json::to_string(&challenge.participants)?,
            ],
        )?;
        Ok(())
    }

    pub fn challenges(&self) -> Result<Vec<Challenge>> {
        let sql = format!("SELECT {CHALLENGE_COLUMNS} FROM challenges ORDER BY end_time");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], challenge_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Challenges whose end time lies strictly before `now`.
    pub fn expired_challenges(&self, now: DateTime<Utc>) -> Result<Vec<Challenge>> {
        let sql = format!(
            "SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE end_time < ?1 ORDER BY end_time"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![encode_ts(&now)], challenge_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// First stored challenge listing `user` among its participants.
    pub fn challenge_with_participant(&self, user: UserId) -> Result<Option<Challenge>> {
        let sql = format!(
            "SELECT {CHALLENGE_COLUMNS} FROM challenges
              WHERE EXISTS (SELECT 1 FROM json_each(challenges.participants) WHERE value = ?1)
              ORDER BY end_time LIMIT 1"
        );
        Ok(self
            .conn()
            .query_row(&sql, params![user], challenge_from_row)
            .optional()?)
    }

    /// Remove a challenge record. Returns whether it still existed.
    pub fn delete_challenge(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM challenges WHERE id = ?1", params![id])?;
        Ok(changed == 1)
    }
}
