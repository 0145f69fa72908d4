//! Worker pool orchestration.
//!
//! A run launches a fixed number of workers, holds them on a barrier until the warmup delay has
//! passed, releases them all at once, and closes the window by dropping the shared run flag.
use crate::error::BenchError;
use crate::worker::Worker;
use humantime::format_duration;
use slobench_core::{RunConfig, RunStatistics, WorkerOutcome};
use std::fmt::Display;
use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Drives one timed run of a request action.
pub struct Coordinator<T> {
    name: String,
    action: T,
    config: RunConfig,
}

impl<T, F, R, E> Coordinator<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Result<R, E>> + Send + 'static,
    R: 'static,
    E: Display + 'static,
{
    pub fn new(name: &str, action: T, config: RunConfig) -> Self {
        Self {
            name: name.to_string(),
            action,
            config,
        }
    }

    pub async fn run(self) -> Result<RunStatistics, BenchError> {
        self.config.validate().map_err(BenchError::InvalidConfig)?;
        let concurrency = self.config.concurrency;

        let run_flag = Arc::new(AtomicBool::new(false));
        let start = Arc::new(Barrier::new(concurrency + 1));

        // Dropping the set aborts every worker, so a cancelled run leaves nothing behind.
        let mut tasks: JoinSet<WorkerOutcome> = JoinSet::new();
        for id in 0..concurrency {
            let worker = Worker::new(
                id,
                &self.name,
                self.action.clone(),
                run_flag.clone(),
                start.clone(),
                self.config.failure_policy,
            );
            tasks.spawn(worker.run());
        }
        debug!("Launched {concurrency} workers.");

        tokio::time::sleep(self.config.warmup).await;

        // NOTE: The flag is raised before joining the barrier so every worker sees it set the
        // moment it is released.
        run_flag.store(true, Ordering::Release);
        start.wait().await;
        let window_start = Instant::now();
        info!(
            "Measurement window open for {}",
            format_duration(self.config.duration)
        );

        tokio::time::sleep(self.config.duration).await;
        run_flag.store(false, Ordering::Release);
        let window = window_start.elapsed();
        debug!("Measurement window closed after {window:?}");

        let mut stats = RunStatistics::new(concurrency, window);
        let deadline = Instant::now() + self.config.shutdown_grace;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(None) => break,
                Ok(Some(Ok(outcome))) => stats.record(&outcome),
                Ok(Some(Err(err))) => {
                    error!("Worker did not complete: {err}");
                    stats.record_unfinished();
                }
                Err(_) => {
                    warn!(
                        "{} workers still running after the {} shutdown grace period. Cancelling.",
                        tasks.len(),
                        format_duration(self.config.shutdown_grace)
                    );
                    for _ in 0..tasks.len() {
                        stats.record_unfinished();
                    }
                    tasks.abort_all();
                    break;
                }
            }
        }

        if stats.aborted_workers > 0 || stats.unfinished_workers > 0 {
            warn!(
                "{} of {} workers excluded from the totals ({} aborted, {} unfinished).",
                stats.aborted_workers + stats.unfinished_workers,
                stats.workers,
                stats.aborted_workers,
                stats.unfinished_workers,
            );
        }

        Ok(stats)
    }
}
