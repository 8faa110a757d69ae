//! Multiple-choice quizzes answered through message reactions.

mod bank;
mod engine;

pub use bank::{load_bank, parse_bank, validate_quiz, MAX_OPTIONS};
pub use engine::{AnswerOutcome, QuizEngine, DEFAULT_VALIDITY_HOURS, STUDY_REMINDER};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, MessageId, UserId};

/// Reactions attached to every posted quiz, one per option slot.
pub const ANSWER_REACTIONS: [&str; 4] = ["1\u{fe0f}\u{20e3}", "2\u{fe0f}\u{20e3}", "3\u{fe0f}\u{20e3}", "4\u{fe0f}\u{20e3}"];

/// Option index selected by a reaction, if it is one of ours.
pub fn option_for_reaction(emoji: &str) -> Option<usize> {
    ANSWER_REACTIONS.iter().position(|r| *r == emoji)
}

/// A question from the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    /// Assigned by the bank; absent in import files.
    #[serde(default)]
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub answer: usize,
}

impl Quiz {
    pub fn correct_option(&self) -> &str {
        self.options.get(self.answer).map(String::as_str).unwrap_or("")
    }
}

/// A posted question awaiting reactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveQuiz {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub quiz: Quiz,
    pub start_time: DateTime<Utc>,
    pub answered_by: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAnswer {
    pub user_id: UserId,
    pub quiz_id: i64,
    pub correct: bool,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub answered: u64,
    pub correct: u64,
}

impl AccuracyReport {
    pub fn rate(&self) -> f64 {
        if self.answered == 0 {
            0.0
        } else {
            self.correct as f64 / self.answered as f64
        }
    }

    pub fn describe(&self, user: UserId) -> String {
        format!(
            "{} Your correct rate is {:.2}%.",
            user.mention(),
            self.rate() * 100.0
        )
    }
}
