use slobench_core::{FailurePolicy, WorkerOutcome, WorkerResult};
use std::fmt::Display;
use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use tokio::sync::Barrier;
#[allow(unused)]
use tracing::{debug, error, trace, warn};

/// One closed-loop load generator.
///
/// A worker parks on the start barrier, then issues one request at a time for as long as the run
/// flag is set. Counts are kept locally and handed back once through the task's join handle.
pub(crate) struct Worker<T> {
    id: usize,
    action: T,
    run_flag: Arc<AtomicBool>,
    start: Arc<Barrier>,
    policy: FailurePolicy,
    recorder: Recorder,
}

impl<T, F, R, E> Worker<T>
where
    T: Fn() -> F,
    F: Future<Output = Result<R, E>>,
    E: Display,
{
    pub fn new(
        id: usize,
        scenario: &str,
        action: T,
        run_flag: Arc<AtomicBool>,
        start: Arc<Barrier>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            id,
            action,
            run_flag,
            start,
            policy,
            recorder: Recorder::new(scenario),
        }
    }

    pub async fn run(self) -> WorkerOutcome {
        self.start.wait().await;
        trace!("Worker {} released.", self.id);

        let mut result = WorkerResult::default();
        // NOTE: The flag is only checked between requests. A request in flight when the window
        // closes is allowed to finish and is counted.
        while self.run_flag.load(Ordering::Acquire) {
            let start = Instant::now();
            let res = (self.action)().await.map(|_| ()).map_err(|e| e.to_string());
            let elapsed = start.elapsed();

            match res {
                Ok(()) => {
                    self.recorder.success(elapsed);
                    result.record_success(elapsed);
                }
                Err(error) => {
                    self.recorder.error(elapsed);
                    result.record_failure();

                    if self.policy == FailurePolicy::Abort {
                        warn!("Worker {} aborted after a failed request: {error}", self.id);
                        return WorkerOutcome::Aborted {
                            partial: result,
                            error,
                        };
                    }
                }
            }

            // Actions which never suspend would otherwise hold this runtime thread.
            tokio::task::yield_now().await;
        }

        debug!(
            "Worker {} finished: {} requests, {} failures",
            self.id, result.request_count, result.failure_count
        );
        WorkerOutcome::Completed(result)
    }
}

pub(crate) const LATENCY_METRIC: &str = "slobench_latency";
pub(crate) const SUCCESS_METRIC: &str = "slobench_success";
pub(crate) const ERROR_METRIC: &str = "slobench_error";

/// Per-request metrics, resolved once per worker so the hot loop does no label lookups.
#[cfg(feature = "metrics")]
struct Recorder {
    latency: metrics::Histogram,
    success: metrics::Counter,
    error: metrics::Counter,
}

#[cfg(feature = "metrics")]
impl Recorder {
    fn new(scenario: &str) -> Self {
        metrics::describe_histogram!(LATENCY_METRIC, metrics::Unit::Seconds, "Request latency");
        Self {
            latency: metrics::histogram!(LATENCY_METRIC, "scenario" => scenario.to_string()),
            success: metrics::counter!(SUCCESS_METRIC, "scenario" => scenario.to_string()),
            error: metrics::counter!(ERROR_METRIC, "scenario" => scenario.to_string()),
        }
    }

    fn success(&self, elapsed: Duration) {
        self.latency.record(elapsed.as_secs_f64());
        self.success.increment(1);
    }

    fn error(&self, elapsed: Duration) {
        self.latency.record(elapsed.as_secs_f64());
        self.error.increment(1);
    }
}

#[cfg(not(feature = "metrics"))]
struct Recorder;

#[cfg(not(feature = "metrics"))]
impl Recorder {
    fn new(_scenario: &str) -> Self {
        Recorder
    }

    fn success(&self, _elapsed: Duration) {}

    fn error(&self, _elapsed: Duration) {}
}
