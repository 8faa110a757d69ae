//! # Studybot Core Library
//!
//! Study tracking and gamification for a chat community: a check-in/check-out
//! ledger, daily and weekly roll-ups with XP and levels, per-user Pomodoro
//! timers, time-boxed group challenges and reaction-answered quizzes.
//! The `studybot` CLI is a thin front end over this crate.
//!
//! ## Architecture
//!
//! - **Engines** ([`SessionLedger`], [`Aggregator`], [`PomodoroEngine`],
//!   [`ChallengeEngine`], [`QuizEngine`]) borrow the [`Database`] and a
//!   [`Platform`], take an explicit `now`, and return [`Event`]s
//! - **Storage**: SQLite documents, one table per kind, plus TOML configuration
//! - **Platform**: the only route to the outside world (messages, channels)
//! - **Scheduler**: one tokio task per periodic job feeding a single worker
//!
//! Sweeps are idempotent: every step tolerates leftovers of an interrupted
//! earlier run, and a failure on one entity never stops the rest.

pub mod challenge;
pub mod error;
pub mod events;
pub mod ids;
pub mod platform;
pub mod quiz;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod timer;

pub use challenge::{Challenge, ChallengeEngine};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::Event;
pub use ids::{ChannelId, MessageId, UserId};
pub use platform::{Member, MemoryPlatform, Notice, Platform, PlatformError};
pub use quiz::{AccuracyReport, ActiveQuiz, AnswerOutcome, Quiz, QuizEngine, UserAnswer};
pub use scheduler::{Job, JobRunner, JobSpec, RunSummary, Schedule, Scheduler};
pub use session::{
    format_duration, Aggregator, CheckOutSummary, LeaderboardEntry, LeaderboardScope,
    SessionLedger, StudyReport, StudySession, UserLevel,
};
pub use storage::{Config, Database};
pub use timer::{PomodoroEngine, PomodoroPhase, PomodoroTimer};
