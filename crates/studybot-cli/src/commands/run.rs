use std::sync::Arc;

use chrono::Utc;
use clap::Args;
use studybot_core::{Job, JobRunner, Platform, Scheduler};
use tokio::sync::watch;

use super::{open, print_json, CliResult};
use crate::console::ConsolePlatform;

#[derive(Args)]
pub struct RunArgs {
    /// Run a single job immediately and exit
    /// (daily_reset, progress_report, pomodoro_sweep, challenge_sweep, quiz_sweep, quiz_broadcast)
    #[arg(long, value_name = "JOB")]
    pub once: Option<String>,
}

pub fn run(args: RunArgs) -> CliResult {
    let (config, db) = open()?;
    let platform: Arc<dyn Platform> = Arc::new(ConsolePlatform);

    if let Some(name) = args.once {
        let job = Job::from_name(&name).ok_or_else(|| format!("unknown job: {name}"))?;
        let runner = JobRunner::new(config, platform)?;
        return print_json(&runner.run(&db, job, Utc::now())?);
    }

    let scheduler = Scheduler::new(db, platform, config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let summary = runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("received ctrl-c, shutting down"),
                Err(e) => tracing::error!("failed to listen for ctrl-c: {e}"),
            }
            let _ = shutdown_tx.send(true);
        });
        scheduler.run(shutdown_rx).await
    });

    print_json(&summary)
}
