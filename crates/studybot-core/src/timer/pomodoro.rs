//! Per-user Pomodoro state machine.
//!
//! The timer is wall-clock based: it stores only its start time and
//! progress flags, and the caller evaluates it against the elapsed time on
//! every sweep.
//!
//! ```text
//! Studying(0) -> OnBreak(0) -> Studying(1) -> ... -> OnBreak(n-1) -> Expired
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "cycle")]
pub enum PomodoroPhase {
    Studying(u32),
    OnBreak(u32),
    Expired,
}

/// The single transition a sweep may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// All cycles elapsed; the timer is deleted.
    Finished,
    BreakStarted,
    BreakEnded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroTimer {
    pub user_id: UserId,
    pub start_time: DateTime<Utc>,
    /// Seconds per study phase.
    pub study_time: u64,
    /// Seconds per break phase.
    pub break_time: u64,
    pub cycles: u32,
    /// 0-indexed cycle in progress.
    pub current_cycle: u32,
    pub on_break: bool,
}

impl PomodoroTimer {
    pub fn new(
        user_id: UserId,
        study_time: u64,
        break_time: u64,
        cycles: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            start_time: now,
            study_time,
            break_time,
            cycles,
            current_cycle: 0,
            on_break: false,
        }
    }

    /// Length of the whole run in seconds.
    pub fn total_secs(&self) -> u64 {
        self.study_time
            .saturating_add(self.break_time)
            .saturating_mul(self.cycles as u64)
    }

    /// Seconds since the timer started (zero if the clock went backwards).
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.start_time).num_seconds().max(0) as u64
    }

    pub fn phase(&self) -> PomodoroPhase {
        if self.current_cycle >= self.cycles {
            PomodoroPhase::Expired
        } else if self.on_break {
            PomodoroPhase::OnBreak(self.current_cycle)
        } else {
            PomodoroPhase::Studying(self.current_cycle)
        }
    }

    /// The transition due at `elapsed` seconds, if any.
    ///
    /// Checked in priority order: completion, then break start, then break
    /// end. Only one fires per evaluation.
    pub fn next_transition(&self, elapsed: u64) -> Option<Transition> {
        let cycle_end = (self.current_cycle as u64).saturating_add(1);
        if elapsed >= self.total_secs() {
            Some(Transition::Finished)
        } else if !self.on_break && elapsed >= self.study_time.saturating_mul(cycle_end) {
            Some(Transition::BreakStarted)
        } else if self.on_break
            && elapsed
                >= self
                    .study_time
                    .saturating_add(self.break_time)
                    .saturating_mul(cycle_end)
        {
            Some(Transition::BreakEnded)
        } else {
            None
        }
    }

    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Finished => {
                self.current_cycle = self.cycles;
                self.on_break = false;
            }
            Transition::BreakStarted => self.on_break = true,
            Transition::BreakEnded => {
                self.current_cycle += 1;
                self.on_break = false;
            }
        }
    }

    /// Evaluate at `now` and apply the due transition.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        let transition = self.next_transition(self.elapsed_secs(now))?;
        self.apply(transition);
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    fn classic() -> PomodoroTimer {
        PomodoroTimer::new(UserId(1), 1500, 300, 4, start())
    }

    #[test]
    fn break_fires_once_at_end_of_study() {
        let mut timer = classic();
        assert_eq!(timer.tick(start() + Duration::seconds(1499)), None);
        assert_eq!(
            timer.tick(start() + Duration::seconds(1500)),
            Some(Transition::BreakStarted)
        );
        assert_eq!(timer.tick(start() + Duration::seconds(1500)), None);
        assert_eq!(timer.phase(), PomodoroPhase::OnBreak(0));
    }

    #[test]
    fn break_end_advances_cycle() {
        let mut timer = classic();
        timer.tick(start() + Duration::seconds(1500));
        assert_eq!(
            timer.tick(start() + Duration::seconds(1800)),
            Some(Transition::BreakEnded)
        );
        assert_eq!(timer.phase(), PomodoroPhase::Studying(1));
        // Second study phase ends at 1500 * 2.
        assert_eq!(timer.tick(start() + Duration::seconds(2999)), None);
        assert_eq!(
            timer.tick(start() + Duration::seconds(3000)),
            Some(Transition::BreakStarted)
        );
    }

    #[test]
    fn completion_wins_over_other_transitions() {
        let timer = classic();
        assert_eq!(timer.total_secs(), 7200);
        assert_eq!(timer.next_transition(7200), Some(Transition::Finished));
        assert_eq!(timer.next_transition(10_000), Some(Transition::Finished));
    }

    #[test]
    fn late_sweep_fires_only_one_transition() {
        let mut timer = classic();
        // Nobody swept for 40 minutes: only the break start fires now.
        assert_eq!(
            timer.tick(start() + Duration::minutes(40)),
            Some(Transition::BreakStarted)
        );
        assert_eq!(
            timer.tick(start() + Duration::minutes(40)),
            Some(Transition::BreakEnded)
        );
        assert_eq!(timer.current_cycle, 1);
    }

    #[test]
    fn current_cycle_stays_below_cycles_until_finished() {
        let mut timer = classic();
        let mut t = 0;
        while t < 7200 {
            timer.tick(start() + Duration::seconds(t));
            assert!(timer.current_cycle < timer.cycles);
            t += 60;
        }
        assert_eq!(timer.tick(start() + Duration::seconds(7200)), Some(Transition::Finished));
        assert_eq!(timer.phase(), PomodoroPhase::Expired);
    }

    #[test]
    fn clock_skew_counts_as_zero_elapsed() {
        let timer = classic();
        assert_eq!(timer.elapsed_secs(start() - Duration::seconds(30)), 0);
    }
}
