use std::path::Path;

use chrono::{DateTime, Duration, Utc};

use super::bank::{load_bank, validate_quiz, MAX_OPTIONS};
use super::{AccuracyReport, ActiveQuiz, Quiz, UserAnswer, ANSWER_REACTIONS};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::ids::{ChannelId, MessageId, UserId};
use crate::platform::{delivery_failed, notify_channel, notify_user, Notice, Platform};
use crate::storage::Database;

pub const DEFAULT_VALIDITY_HOURS: i64 = 12;

/// Posted instead of a quiz when the bank is empty.
pub const STUDY_REMINDER: &str = "Remember to study and check in today!";

const QUIZ_COLOR: u32 = 0x3498db;
const CORRECT_COLOR: u32 = 0x00ff00;
const INCORRECT_COLOR: u32 = 0xff0000;

/// Result of a reaction on a quiz message.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// Not a quiz, not an answer slot, or the user already answered.
    Ignored,
    Recorded { correct: bool, events: Vec<Event> },
}

pub struct QuizEngine<'a> {
    db: &'a Database,
    platform: &'a dyn Platform,
    validity: Duration,
}

impl<'a> QuizEngine<'a> {
    pub fn new(db: &'a Database, platform: &'a dyn Platform) -> Self {
        Self {
            db,
            platform,
            validity: Duration::hours(DEFAULT_VALIDITY_HOURS),
        }
    }

    /// Non-positive or out-of-range values keep the current window.
    pub fn with_validity_hours(mut self, hours: i64) -> Self {
        match Duration::try_hours(hours).filter(|d| *d > Duration::zero()) {
            Some(validity) => self.validity = validity,
            None => tracing::warn!(hours, "ignoring invalid quiz validity"),
        }
        self
    }

    fn quiz_notice(&self, quiz: &Quiz) -> Notice {
        let mut notice = Notice::card("📚 Quiz Time!", quiz.question.clone(), QUIZ_COLOR);
        for (i, option) in quiz.options.iter().enumerate() {
            notice = notice.block_field(format!("Option {}", i + 1), option.clone());
        }
        notice.footer(format!(
            "React with the number corresponding to your answer. I'll DM you the answer. \
             Quiz is only valid for {} hours.",
            self.validity.num_hours()
        ))
    }

    /// Post a random question from the bank to `channel`.
    ///
    /// # Errors
    /// `NoQuizzesAvailable` for an empty bank; `DeliveryFailed` if the
    /// question cannot be posted.
    pub fn start_quiz(&self, channel: ChannelId, now: DateTime<Utc>) -> Result<Event> {
        let quiz = self.db.sample_quiz()?.ok_or(CoreError::NoQuizzesAvailable)?;
        let message = self
            .platform
            .send_to_channel(channel, &self.quiz_notice(&quiz))
            .map_err(|e| delivery_failed(format!("channel:{channel}"), e))?;
        if let Err(e) = self.platform.add_reactions(channel, message, &ANSWER_REACTIONS) {
            tracing::warn!(message = %message, "adding answer reactions failed: {e}");
        }

        let quiz_id = quiz.id;
        self.db.insert_active_quiz(&ActiveQuiz {
            message_id: message,
            channel_id: channel,
            quiz,
            start_time: now,
            answered_by: Vec::new(),
        })?;
        tracing::info!(channel = %channel, message = %message, quiz_id, "quiz posted");
        Ok(Event::QuizPosted {
            message,
            channel,
            quiz_id,
            at: now,
        })
    }

    /// Record `user`'s reaction choosing `option` (0-based).
    ///
    /// The first answer per user wins; later reactions are ignored. The
    /// answer counts as long as the quiz has not been swept away.
    ///
    /// The claim on the quiz commits before the answer is logged. If logging
    /// fails the user stays locked out of that quiz with no answer recorded.
    pub fn record_answer(
        &self,
        message: MessageId,
        user: UserId,
        option: usize,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome> {
        if option >= MAX_OPTIONS {
            return Ok(AnswerOutcome::Ignored);
        }
        let Some(active) = self.db.active_quiz(message)? else {
            return Ok(AnswerOutcome::Ignored);
        };
        if active.answered_by.contains(&user) || !self.db.claim_answer(message, user)? {
            tracing::debug!(message = %message, user = %user, "repeat answer ignored");
            return Ok(AnswerOutcome::Ignored);
        }

        let quiz = &active.quiz;
        let correct = option == quiz.answer;
        let notice = if correct {
            Notice::card(
                "✅ Correct!",
                format!(
                    "The question was: {}.\nThe correct answer is:\n**{}**.",
                    quiz.question,
                    quiz.correct_option()
                ),
                CORRECT_COLOR,
            )
        } else {
            Notice::card(
                "❌ Incorrect.",
                format!(
                    "Sorry, the correct answer was\n**{}**.\nThe question was:\n{}.",
                    quiz.correct_option(),
                    quiz.question
                ),
                INCORRECT_COLOR,
            )
        };

        if let Err(e) = self.db.insert_user_answer(&UserAnswer {
            user_id: user,
            quiz_id: quiz.id,
            correct,
            answered_at: now,
        }) {
            tracing::error!(message = %message, user = %user, "answer claimed but not logged: {e}");
            return Err(e);
        }

        let mut events = vec![Event::QuizAnswered {
            message,
            user,
            correct,
            at: now,
        }];
        events.extend(notify_user(self.platform, user, &notice, now));
        tracing::info!(message = %message, user = %user, correct, "quiz answered");
        Ok(AnswerOutcome::Recorded { correct, events })
    }

    /// Delete every quiz older than the validity window. No notice is sent.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let Some(cutoff) = now.checked_sub_signed(self.validity) else {
            return Ok(Vec::new());
        };
        let count = self.db.delete_quizzes_started_before(cutoff)?;
        if count == 0 {
            tracing::debug!("quiz sweep: nothing expired");
            return Ok(Vec::new());
        }
        tracing::info!(count, "expired quizzes removed");
        Ok(vec![Event::QuizzesExpired { count, at: now }])
    }

    /// Quizzes still open for answers, oldest first.
    pub fn active_quizzes(&self) -> Result<Vec<ActiveQuiz>> {
        self.db.active_quizzes()
    }

    /// `None` if the user has never answered.
    pub fn accuracy_report(&self, user: UserId) -> Result<Option<AccuracyReport>> {
        let (answered, correct) = self.db.answer_counts(user)?;
        if answered == 0 {
            return Ok(None);
        }
        Ok(Some(AccuracyReport { answered, correct }))
    }

    /// Validate and store one question, returning its id.
    pub fn add_quiz(&self, quiz: &Quiz) -> Result<i64> {
        validate_quiz(quiz)?;
        self.db.insert_quiz(quiz)
    }

    /// Seed the bank from a JSON file. Does nothing if the bank already has
    /// questions; returns the number imported.
    pub fn import_bank(&self, path: &Path) -> Result<usize> {
        if self.db.quiz_bank_count()? > 0 {
            tracing::info!(path = %path.display(), "quiz bank already seeded, skipping import");
            return Ok(0);
        }
        let quizzes = load_bank(path)?;
        for quiz in &quizzes {
            self.db.insert_quiz(quiz)?;
        }
        tracing::info!(count = quizzes.len(), "quiz bank imported");
        Ok(quizzes.len())
    }

    /// Post a fresh quiz to each channel, or a study reminder when the bank
    /// is empty. A failing channel does not stop the others.
    pub fn broadcast(&self, channels: &[ChannelId], now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        for &channel in channels {
            match self.start_quiz(channel, now) {
                Ok(event) => events.push(event),
                Err(CoreError::NoQuizzesAvailable) => {
                    match notify_channel(self.platform, channel, &Notice::text(STUDY_REMINDER), now)
                    {
                        Some(failed) => events.push(failed),
                        None => events.push(Event::StudyReminderSent { channel, at: now }),
                    }
                }
                Err(CoreError::DeliveryFailed { target, reason }) => {
                    tracing::warn!(channel = %channel, "quiz broadcast failed: {reason}");
                    events.push(Event::NotificationFailed {
                        target,
                        reason,
                        at: now,
                    });
                }
                Err(e) => tracing::warn!(channel = %channel, "quiz broadcast failed: {e}"),
            }
        }
        events
    }
}
