use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, MessageId, UserId};

/// Every state change in the system produces an Event.
/// Commands return them to the front end; sweeps return them to the scheduler,
/// which logs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CheckedIn {
        user: UserId,
        channel: ChannelId,
        at: DateTime<Utc>,
    },
    CheckedOut {
        user: UserId,
        channel: ChannelId,
        elapsed_secs: f64,
        daily_study_time: f64,
        at: DateTime<Utc>,
    },
    GoalSet {
        user: UserId,
        channel: ChannelId,
        goal_secs: i64,
        at: DateTime<Utc>,
    },
    DailyReset {
        sessions: usize,
        records: usize,
        at: DateTime<Utc>,
    },
    ProgressReported {
        user: UserId,
        total_study_time: f64,
        at: DateTime<Utc>,
    },
    PomodoroStarted {
        user: UserId,
        study_time: u64,
        break_time: u64,
        cycles: u32,
        at: DateTime<Utc>,
    },
    PomodoroStopped {
        user: UserId,
        existed: bool,
        at: DateTime<Utc>,
    },
    BreakStarted {
        user: UserId,
        cycle: u32,
        at: DateTime<Utc>,
    },
    BreakEnded {
        user: UserId,
        /// The cycle that starts now.
        cycle: u32,
        at: DateTime<Utc>,
    },
    PomodoroFinished {
        user: UserId,
        at: DateTime<Utc>,
    },
    ChallengeStarted {
        id: String,
        channel: ChannelId,
        participants: Vec<UserId>,
        end_time: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// Announcement message is gone; teardown retried next sweep.
    ChallengeDeferred {
        id: String,
        at: DateTime<Utc>,
    },
    ChallengeEnded {
        id: String,
        channel: ChannelId,
        checked_out: Vec<UserId>,
        at: DateTime<Utc>,
    },
    /// Record without an initiating channel, removed without a completion notice.
    ChallengePurged {
        id: String,
        channel: ChannelId,
        at: DateTime<Utc>,
    },
    QuizPosted {
        message: MessageId,
        channel: ChannelId,
        quiz_id: i64,
        at: DateTime<Utc>,
    },
    QuizAnswered {
        message: MessageId,
        user: UserId,
        correct: bool,
        at: DateTime<Utc>,
    },
    QuizzesExpired {
        count: usize,
        at: DateTime<Utc>,
    },
    StudyReminderSent {
        channel: ChannelId,
        at: DateTime<Utc>,
    },
    NotificationFailed {
        target: String,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short machine name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::CheckedIn { .. } => "checked_in",
            Event::CheckedOut { .. } => "checked_out",
            Event::GoalSet { .. } => "goal_set",
            Event::DailyReset { .. } => "daily_reset",
            Event::ProgressReported { .. } => "progress_reported",
            Event::PomodoroStarted { .. } => "pomodoro_started",
            Event::PomodoroStopped { .. } => "pomodoro_stopped",
            Event::BreakStarted { .. } => "break_started",
            Event::BreakEnded { .. } => "break_ended",
            Event::PomodoroFinished { .. } => "pomodoro_finished",
            Event::ChallengeStarted { .. } => "challenge_started",
            Event::ChallengeDeferred { .. } => "challenge_deferred",
            Event::ChallengeEnded { .. } => "challenge_ended",
            Event::ChallengePurged { .. } => "challenge_purged",
            Event::QuizPosted { .. } => "quiz_posted",
            Event::QuizAnswered { .. } => "quiz_answered",
            Event::QuizzesExpired { .. } => "quizzes_expired",
            Event::StudyReminderSent { .. } => "study_reminder_sent",
            Event::NotificationFailed { .. } => "notification_failed",
        }
    }
}
