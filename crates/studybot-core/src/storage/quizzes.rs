//! Question bank, active quizzes and the append-only answer log.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::database::{encode_ts, json_column, ts_column, Database};
use crate::error::Result;
use crate::ids::{MessageId, UserId};
use crate::quiz::{ActiveQuiz, Quiz, UserAnswer};

const ACTIVE_COLUMNS: &str = "message_id, channel_id, quiz, start_time, answered_by";

fn quiz_from_row(row: &Row<'_>) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: row.get(0)?,
        question: row.get(1)?,
        options: json_column(row, 2)?,
        answer: row.get::<_, i64>(3)?.max(0) as usize,
    })
}

fn active_from_row(row: &Row<'_>) -> rusqlite::Result<ActiveQuiz> {
    Ok(ActiveQuiz {
        message_id: row.get(0)?,
        channel_id: row.get(1)?,
        quiz: json_column(row, 2)?,
        start_time: ts_column(row, 3)?,
        answered_by: json_column(row, 4)?,
    })
}

impl Database {
    // ── Bank ────────────────────────────────────────────────────────

    /// Add a question to the bank, returning its new id.
    pub fn insert_quiz(&self, quiz: &Quiz) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO quiz_bank (question, options, answer) VALUES (?1, ?2, ?3)",
            params![
                quiz.question,
                serde_json::to_string(&quiz.options)?,
                quiz.answer as i64
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    pub fn quiz_bank_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM quiz_bank", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Uniformly random question, or `None` for an empty bank.
    pub fn sample_quiz(&self) -> Result<Option<Quiz>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, question, options, answer FROM quiz_bank ORDER BY RANDOM() LIMIT 1",
                [],
                quiz_from_row,
            )
            .optional()?)
    }

    // ── Active quizzes ──────────────────────────────────────────────

    pub fn insert_active_quiz(&self, active: &ActiveQuiz) -> Result<()> {
        self.conn().execute(
            "INSERT INTO active_quizzes (message_id, channel_id, quiz, start_time, answered_by)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                active.message_id,
                active.channel_id,
                serde_json::to_string(&active.quiz)?,
                encode_ts(&active.start_time),
                serde_json::to_string(&active.answered_by)?,
            ],
        )?;
        Ok(())
    }

    pub fn active_quiz(&self, message: MessageId) -> Result<Option<ActiveQuiz>> {
        let sql = format!("SELECT {ACTIVE_COLUMNS} FROM active_quizzes WHERE message_id = ?1");
        Ok(self
            .conn()
            .query_row(&sql, params![message], active_from_row)
            .optional()?)
    }

    pub fn active_quizzes(&self) -> Result<Vec<ActiveQuiz>> {
        let sql = format!("SELECT {ACTIVE_COLUMNS} FROM active_quizzes ORDER BY start_time");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], active_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Append `user` to the quiz's `answered_by` unless already present.
    ///
    /// Returns `false` if the user had answered or the quiz is gone.
    pub fn claim_answer(&self, message: MessageId, user: UserId) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE active_quizzes
                SET answered_by = json_insert(answered_by, '$[#]', ?2)
              WHERE message_id = ?1
                AND NOT EXISTS (
                    SELECT 1 FROM json_each(active_quizzes.answered_by) WHERE value = ?2
                )",
            params![message, user],
        )?;
        Ok(changed == 1)
    }

    /// Delete every active quiz started strictly before `cutoff`.
    pub fn delete_quizzes_started_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        Ok(self.conn().execute(
            "DELETE FROM active_quizzes WHERE start_time < ?1",
            params![encode_ts(&cutoff)],
        )?)
    }

    // ── Answer log ──────────────────────────────────────────────────

    pub fn insert_user_answer(&self, answer: &UserAnswer) -> Result<()> {
        self.conn().execute(
            "INSERT INTO user_answers (user_id, quiz_id, correct, answered_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                answer.user_id,
                answer.quiz_id,
                answer.correct,
                encode_ts(&answer.answered_at)
            ],
        )?;
        Ok(())
    }

    /// `(answered, correct)` counts for a user.
    pub fn answer_counts(&self, user: UserId) -> Result<(u64, u64)> {
        let (total, correct): (i64, i64) = self.conn().query_row(
            "SELECT COUNT(*), COALESCE(SUM(correct), 0) FROM user_answers WHERE user_id = ?1",
            params![user],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((total as u64, correct as u64))
    }

    pub fn correct_answer_count(&self, user: UserId) -> Result<u64> {
        Ok(self.answer_counts(user)?.1)
    }
}
