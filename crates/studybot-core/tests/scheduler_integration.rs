//! Integration tests for the tokio scheduler loop.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use studybot_core::timer::TIMER_ENDED;
use studybot_core::{
    Config, Database, Job, JobSpec, MemoryPlatform, Platform, PomodoroTimer, Schedule, Scheduler,
    UserId,
};
use tokio::sync::watch;

#[tokio::test]
async fn test_scheduler_runs_sweeps_until_shutdown() {
    let db = Database::open_memory().unwrap();
    // A timer that is already past its end.
    let started = Utc::now() - Duration::hours(3);
    db.upsert_timer(&PomodoroTimer::new(UserId(1), 60, 60, 1, started))
        .unwrap();

    let platform = Arc::new(MemoryPlatform::new());
    let specs = vec![
        JobSpec {
            job: Job::PomodoroSweep,
            schedule: Schedule::Every(StdDuration::from_millis(20)),
        },
        JobSpec {
            job: Job::QuizSweep,
            schedule: Schedule::Every(StdDuration::from_millis(20)),
        },
    ];
    let scheduler = Scheduler::with_specs(
        db,
        platform.clone() as Arc<dyn Platform>,
        Config::default(),
        specs,
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(scheduler.run(shutdown_rx));

    tokio::time::sleep(StdDuration::from_millis(300)).await;
    shutdown_tx.send(true).unwrap();
    let summary = tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    assert!(summary.jobs_run >= 2);
    assert_eq!(summary.jobs_failed, 0);
    // The finished timer was notified exactly once across all sweeps.
    let dms = platform.direct_messages(UserId(1));
    assert_eq!(dms.len(), 1);
    assert_eq!(dms[0].description, TIMER_ENDED);
}

#[tokio::test]
async fn test_dropped_shutdown_sender_stops_scheduler() {
    let scheduler = Scheduler::new(
        Database::open_memory().unwrap(),
        Arc::new(MemoryPlatform::new()),
        Config::default(),
    )
    .unwrap();
    assert_eq!(scheduler.specs().len(), 6);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(scheduler.run(shutdown_rx));
    drop(shutdown_tx);

    let summary = tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();
    assert_eq!(summary.jobs_run, 0);
}
