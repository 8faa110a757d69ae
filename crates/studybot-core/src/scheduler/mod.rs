//! Background job scheduler.
//!
//! Each [`Job`] has its own [`Schedule`] and its own tokio task that sleeps
//! until the next fire time and then pushes the job onto a bounded work
//! queue. A single worker drains the queue and runs each job on the
//! blocking pool, so a slow sweep never delays the timers of other jobs or
//! the command path. A job that fires while the queue is full is dropped;
//! the next run re-evaluates persisted state anyway.

mod schedule;

pub use schedule::Schedule;

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

use crate::challenge::ChallengeEngine;
use crate::error::Result;
use crate::events::Event;
use crate::platform::Platform;
use crate::quiz::QuizEngine;
use crate::session::Aggregator;
use crate::storage::{Config, Database};
use crate::timer::PomodoroEngine;

const QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    PomodoroSweep,
    ChallengeSweep,
    QuizSweep,
    DailyReset,
    ProgressReport,
    QuizBroadcast,
}

impl Job {
    pub const ALL: [Job; 6] = [
        Job::PomodoroSweep,
        Job::ChallengeSweep,
        Job::QuizSweep,
        Job::DailyReset,
        Job::ProgressReport,
        Job::QuizBroadcast,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Job::PomodoroSweep => "pomodoro_sweep",
            Job::ChallengeSweep => "challenge_sweep",
            Job::QuizSweep => "quiz_sweep",
            Job::DailyReset => "daily_reset",
            Job::ProgressReport => "progress_report",
            Job::QuizBroadcast => "quiz_broadcast",
        }
    }

    pub fn from_name(name: &str) -> Option<Job> {
        Job::ALL.into_iter().find(|job| job.name() == name)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub job: Job,
    pub schedule: Schedule,
}

/// The standard job table for a configuration.
pub fn plan(config: &Config) -> Result<Vec<JobSpec>> {
    let offset = config.offset()?;
    let poll = StdDuration::from_secs(config.scheduler.poll_interval_secs);
    Ok(vec![
        JobSpec {
            job: Job::PomodoroSweep,
            schedule: Schedule::Every(poll),
        },
        JobSpec {
            job: Job::ChallengeSweep,
            schedule: Schedule::Every(poll),
        },
        JobSpec {
            job: Job::QuizSweep,
            schedule: Schedule::Every(poll),
        },
        JobSpec {
            job: Job::DailyReset,
            schedule: Schedule::daily_at(vec![config.daily_reset_at()?], offset),
        },
        JobSpec {
            job: Job::ProgressReport,
            schedule: Schedule::daily_at(vec![config.progress_report_at()?], offset),
        },
        JobSpec {
            job: Job::QuizBroadcast,
            schedule: Schedule::daily_at(config.quiz_broadcast_at()?, offset),
        },
    ])
}

/// Runs a single job against a store. Also used for one-off runs from the CLI.
pub struct JobRunner {
    config: Config,
    offset: FixedOffset,
    platform: Arc<dyn Platform>,
}

impl JobRunner {
    pub fn new(config: Config, platform: Arc<dyn Platform>) -> Result<Self> {
        let offset = config.offset()?;
        Ok(Self {
            config,
            offset,
            platform,
        })
    }

    pub fn run(&self, db: &Database, job: Job, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let platform = self.platform.as_ref();
        match job {
            Job::PomodoroSweep => PomodoroEngine::new(db, platform).sweep(now),
            Job::ChallengeSweep => ChallengeEngine::new(db, platform, self.offset).sweep(now),
            Job::QuizSweep => self.quizzes(db).sweep(now),
            Job::DailyReset => Ok(vec![Aggregator::new(db, self.offset).daily_reset(now)?]),
            Job::ProgressReport => {
                Aggregator::new(db, self.offset).send_progress_reports(platform, now)
            }
            Job::QuizBroadcast => {
                Ok(self.quizzes(db).broadcast(&self.config.quiz.broadcast_channels, now))
            }
        }
    }

    fn quizzes<'a>(&'a self, db: &'a Database) -> QuizEngine<'a> {
        QuizEngine::new(db, self.platform.as_ref()).with_validity_hours(self.config.quiz.validity_hours)
    }
}

/// Counters for one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub jobs_run: usize,
    pub jobs_failed: usize,
    pub events: usize,
}

pub struct Scheduler {
    db: Arc<Mutex<Database>>,
    runner: Arc<JobRunner>,
    specs: Vec<JobSpec>,
}

impl Scheduler {
    /// Scheduler with the standard job table for `config`.
    pub fn new(db: Database, platform: Arc<dyn Platform>, config: Config) -> Result<Self> {
        let specs = plan(&config)?;
        Self::with_specs(db, platform, config, specs)
    }

    pub fn with_specs(
        db: Database,
        platform: Arc<dyn Platform>,
        config: Config,
        specs: Vec<JobSpec>,
    ) -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            runner: Arc::new(JobRunner::new(config, platform)?),
            specs,
        })
    }

    pub fn specs(&self) -> &[JobSpec] {
        &self.specs
    }

    /// Run until `shutdown` turns `true` (or its sender is dropped).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let (queue, mut jobs) = mpsc::channel::<Job>(QUEUE_CAPACITY);
        let mut tickers = Vec::with_capacity(self.specs.len());
        for spec in self.specs.iter().cloned() {
            tracing::info!(job = %spec.job, "scheduling job");
            tickers.push(tokio::spawn(ticker(spec, queue.clone(), shutdown.clone())));
        }
        drop(queue);

        let mut summary = RunSummary::default();
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                job = jobs.recv() => match job {
                    Some(job) => self.execute(job, &mut summary).await,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        for ticker in tickers {
            ticker.abort();
        }
        tracing::info!(
            jobs_run = summary.jobs_run,
            jobs_failed = summary.jobs_failed,
            "scheduler stopped"
        );
        summary
    }

    async fn execute(&self, job: Job, summary: &mut RunSummary) {
        let db = Arc::clone(&self.db);
        let runner = Arc::clone(&self.runner);
        let result = tokio::task::spawn_blocking(move || {
            let db = db.lock().unwrap_or_else(|e| e.into_inner());
            runner.run(&db, job, Utc::now())
        })
        .await;

        summary.jobs_run += 1;
        match result {
            Ok(Ok(events)) => {
                summary.events += events.len();
                for event in &events {
                    tracing::info!(job = %job, event = event.kind(), "{}", serde_json::to_string(event).unwrap_or_default());
                }
            }
            Ok(Err(e)) => {
                summary.jobs_failed += 1;
                tracing::warn!(job = %job, "job failed: {e}");
            }
            Err(e) => {
                summary.jobs_failed += 1;
                tracing::error!(job = %job, "job panicked: {e}");
            }
        }
    }
}

/// Sleep until each fire time and enqueue the job.
async fn ticker(spec: JobSpec, queue: mpsc::Sender<Job>, mut shutdown: watch::Receiver<bool>) {
    loop {
        let now = Utc::now();
        let Some(next) = spec.schedule.next_after(now) else {
            tracing::warn!(job = %spec.job, "schedule never fires");
            return;
        };
        let wait = (next - now).to_std().unwrap_or(StdDuration::ZERO);
        tracing::debug!(job = %spec.job, next = %next, "next run");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => return,
        }
        if *shutdown.borrow() {
            return;
        }

        match queue.try_send(spec.job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                tracing::warn!(job = %job, "work queue full, dropping run");
            }
            Err(TrySendError::Closed(_)) => return,
        }
    }
}
