//! Pomodoro engine: start, stop and the periodic sweep.
//!
//! The engine holds no state of its own. Every sweep loads all timers,
//! evaluates each one against the wall clock and persists at most one
//! transition per timer before notifying its owner.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = PomodoroEngine::new(&db, &platform);
//! engine.start(user, 25 * 60, 5 * 60, 4, now)?;
//! // Every poll interval:
//! let events = engine.sweep(Utc::now())?;
//! ```

use chrono::{DateTime, Utc};

use super::pomodoro::{PomodoroTimer, Transition};
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::ids::UserId;
use crate::platform::{notify_user, Notice, Platform};
use crate::storage::Database;

pub const TIMER_ENDED: &str = "Your Pomodoro timer has ended!";
pub const BREAK_STARTED: &str = "Time for a break!";
pub const BREAK_ENDED: &str = "Break's over, back to work!";

pub struct PomodoroEngine<'a> {
    db: &'a Database,
    platform: &'a dyn Platform,
}

impl<'a> PomodoroEngine<'a> {
    pub fn new(db: &'a Database, platform: &'a dyn Platform) -> Self {
        Self { db, platform }
    }

    /// Start a timer for `user`, replacing any timer already running.
    ///
    /// `study_time` and `break_time` are in seconds.
    ///
    /// # Errors
    /// `Validation` if the study phase or the cycle count is zero.
    pub fn start(
        &self,
        user: UserId,
        study_time: u64,
        break_time: u64,
        cycles: u32,
        now: DateTime<Utc>,
    ) -> Result<Event> {
        if study_time == 0 {
            return Err(ValidationError::InvalidValue {
                field: "study_time".into(),
                message: "must be at least one second".into(),
            }
            .into());
        }
        if cycles == 0 {
            return Err(ValidationError::InvalidValue {
                field: "cycles".into(),
                message: "must be at least 1".into(),
            }
            .into());
        }

        let timer = PomodoroTimer::new(user, study_time, break_time, cycles, now);
        if self.db.upsert_timer(&timer)? {
            tracing::info!(user = %user, "replaced running pomodoro timer");
        }
        tracing::info!(user = %user, study_time, break_time, cycles, "pomodoro started");
        Ok(Event::PomodoroStarted {
            user,
            study_time,
            break_time,
            cycles,
            at: now,
        })
    }

    /// Remove the user's timer. Not an error if none is running.
    pub fn stop(&self, user: UserId, now: DateTime<Utc>) -> Result<Event> {
        let existed = self.db.delete_timer(user)?;
        if existed {
            tracing::info!(user = %user, "pomodoro stopped");
        } else {
            tracing::debug!(user = %user, "stop requested without a running timer");
        }
        Ok(Event::PomodoroStopped {
            user,
            existed,
            at: now,
        })
    }

    pub fn timer(&self, user: UserId) -> Result<Option<PomodoroTimer>> {
        self.db.timer(user)
    }

    /// Evaluate every stored timer at `now`.
    ///
    /// A failure on one timer is logged and the sweep moves on.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for timer in self.db.timers()? {
            let user = timer.user_id;
            match self.advance(timer, now) {
                Ok(mut produced) => events.append(&mut produced),
                Err(e) => tracing::warn!(user = %user, "pomodoro sweep failed: {e}"),
            }
        }
        if events.is_empty() {
            tracing::debug!("pomodoro sweep: nothing due");
        }
        Ok(events)
    }

    fn advance(&self, mut timer: PomodoroTimer, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let user = timer.user_id;
        let start_time = timer.start_time;
        let Some(transition) = timer.tick(now) else {
            return Ok(Vec::new());
        };

        // Persist first so a failed delivery can never replay the transition.
        let applied = match transition {
            Transition::Finished => self.db.delete_timer_if(user, start_time)?,
            Transition::BreakStarted | Transition::BreakEnded => self.db.update_timer_phase(
                user,
                start_time,
                timer.current_cycle,
                timer.on_break,
            )?,
        };
        if !applied {
            tracing::debug!(user = %user, "timer changed during sweep, skipping");
            return Ok(Vec::new());
        }

        let (text, event) = match transition {
            Transition::Finished => {
                tracing::info!(user = %user, "pomodoro finished");
                (TIMER_ENDED, Event::PomodoroFinished { user, at: now })
            }
            Transition::BreakStarted => {
                tracing::info!(user = %user, cycle = timer.current_cycle, "break started");
                (
                    BREAK_STARTED,
                    Event::BreakStarted {
                        user,
                        cycle: timer.current_cycle,
                        at: now,
                    },
                )
            }
            Transition::BreakEnded => {
                tracing::info!(user = %user, cycle = timer.current_cycle, "break ended");
                (
                    BREAK_ENDED,
                    Event::BreakEnded {
                        user,
                        cycle: timer.current_cycle,
                        at: now,
                    },
                )
            }
        };

        let mut events = vec![event];
        events.extend(notify_user(self.platform, user, &Notice::text(text), now));
        Ok(events)
    }
}
