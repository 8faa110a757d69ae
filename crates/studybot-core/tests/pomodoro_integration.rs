//! Integration tests for the Pomodoro engine sweep.
//!
//! Drives a full 25/5 x 4 run through the sweep at chosen instants and
//! checks persisted state and delivered notices after each one.

use chrono::{DateTime, Duration, TimeZone, Utc};
use studybot_core::timer::{BREAK_ENDED, BREAK_STARTED, TIMER_ENDED};
use studybot_core::{Database, Event, MemoryPlatform, PomodoroEngine, PomodoroPhase, UserId};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    start() + Duration::seconds(secs)
}

#[test]
fn test_classic_pomodoro_run() {
    let db = Database::open_memory().unwrap();
    let platform = MemoryPlatform::new();
    let engine = PomodoroEngine::new(&db, &platform);
    let user = UserId(7);

    engine.start(user, 1500, 300, 4, start()).unwrap();

    // Nothing due before the first study phase ends.
    assert!(engine.sweep(at(1440)).unwrap().is_empty());

    let events = engine.sweep(at(1500)).unwrap();
    assert!(matches!(events[..], [Event::BreakStarted { cycle: 0, .. }]));
    // Same instant again: no duplicate transition or notice.
    assert!(engine.sweep(at(1500)).unwrap().is_empty());
    assert_eq!(platform.direct_messages(user).len(), 1);
    assert_eq!(
        engine.timer(user).unwrap().unwrap().phase(),
        PomodoroPhase::OnBreak(0)
    );

    let events = engine.sweep(at(1800)).unwrap();
    assert!(matches!(events[..], [Event::BreakEnded { cycle: 1, .. }]));
    assert_eq!(
        engine.timer(user).unwrap().unwrap().phase(),
        PomodoroPhase::Studying(1)
    );

    let events = engine.sweep(at(7200)).unwrap();
    assert!(matches!(events[..], [Event::PomodoroFinished { .. }]));
    assert!(engine.timer(user).unwrap().is_none());

    let texts: Vec<String> = platform
        .direct_messages(user)
        .into_iter()
        .map(|n| n.description)
        .collect();
    assert_eq!(texts, vec![BREAK_STARTED, BREAK_ENDED, TIMER_ENDED]);
}

#[test]
fn test_every_minute_sweep_fires_each_transition_once() {
    let db = Database::open_memory().unwrap();
    let platform = MemoryPlatform::new();
    let engine = PomodoroEngine::new(&db, &platform);
    let user = UserId(7);
    engine.start(user, 1500, 300, 4, start()).unwrap();

    let mut breaks = 0;
    let mut resumes = 0;
    let mut finished = 0;
    for minute in 1..=130 {
        for event in engine.sweep(at(minute * 60)).unwrap() {
            match event {
                Event::BreakStarted { .. } => breaks += 1,
                Event::BreakEnded { .. } => resumes += 1,
                Event::PomodoroFinished { .. } => finished += 1,
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
    // The last break ends with the run, so only three breaks end early.
    assert_eq!((breaks, resumes, finished), (4, 3, 1));
    assert!(engine.timer(user).unwrap().is_none());
}

#[test]
fn test_restart_replaces_running_timer() {
    let db = Database::open_memory().unwrap();
    let platform = MemoryPlatform::new();
    let engine = PomodoroEngine::new(&db, &platform);
    let user = UserId(7);

    engine.start(user, 1500, 300, 4, start()).unwrap();
    engine.start(user, 600, 60, 1, at(1000)).unwrap();

    // The first run's break would be due at 1500; the new run's at 1600.
    assert!(engine.sweep(at(1500)).unwrap().is_empty());
    let events = engine.sweep(at(1600)).unwrap();
    assert!(matches!(events[..], [Event::BreakStarted { .. }]));
    assert_eq!(db.timers().unwrap().len(), 1);
}

#[test]
fn test_stop_removes_timer() {
    let db = Database::open_memory().unwrap();
    let platform = MemoryPlatform::new();
    let engine = PomodoroEngine::new(&db, &platform);

    engine.start(UserId(7), 1500, 300, 4, start()).unwrap();
    let event = engine.stop(UserId(7), at(10)).unwrap();
    assert!(matches!(event, Event::PomodoroStopped { existed: true, .. }));
    assert!(engine.sweep(at(7200)).unwrap().is_empty());
    assert_eq!(platform.direct_message_count(), 0);
}
