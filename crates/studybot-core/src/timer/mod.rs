mod engine;
mod pomodoro;

pub use engine::{PomodoroEngine, BREAK_ENDED, BREAK_STARTED, TIMER_ENDED};
pub use pomodoro::{PomodoroPhase, PomodoroTimer, Transition};
