//! Scenario definition and evaluation
use crate::coordinator::Coordinator;
use crate::error::{BenchError, SentinelFailure};
use slobench_core::{
    FailurePolicy, RunConfig, RunStatistics, DEFAULT_EXPECTED_STATUS, DEFAULT_LATENCY_THRESHOLD,
};
use std::{
    fmt,
    fmt::Display,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

type BoxedRun = Pin<Box<dyn Future<Output = Result<ScenarioReport, BenchError>> + Send>>;

/// A single benchmarked endpoint.
///
/// `sentinel` is issued once before the run and must return the expected HTTP status. `load` is
/// the action every worker repeats for the length of the window. Awaiting the scenario evaluates
/// it.
///
/// # Example
/// ```no_run
/// use slobench::prelude::*;
/// use std::time::Duration;
///
/// # async fn check() -> Result<(), BenchError> {
/// let report = Scenario::new(
///     "health",
///     || async { Ok::<u16, String>(200) },
///     || async { Ok::<(), String>(()) },
/// )
/// .threshold(Duration::from_millis(100))
/// .concurrency(10)
/// .duration(Duration::from_secs(10))
/// .await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
#[pin_project::pin_project]
pub struct Scenario<S, L> {
    name: String,
    sentinel: S,
    load: L,
    threshold: Duration,
    expected_status: u16,
    config: RunConfig,
    runner_fut: Option<BoxedRun>,
}

impl<S, L> Scenario<S, L> {
    pub fn new(name: &str, sentinel: S, load: L) -> Self {
        Self {
            name: name.to_string(),
            sentinel,
            load,
            threshold: DEFAULT_LATENCY_THRESHOLD,
            expected_status: DEFAULT_EXPECTED_STATUS,
            config: RunConfig::default(),
            runner_fut: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum acceptable mean latency.
    pub fn threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    /// Status the sentinel request must return (default `200`).
    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Pause between launching the workers and opening the measurement window.
    pub fn warmup(mut self, warmup: Duration) -> Self {
        self.config.warmup = warmup;
        self
    }

    /// Length of the measurement window.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = duration;
        self
    }

    /// How long to wait for in-flight requests once the window has closed.
    pub fn shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.config.shutdown_grace = shutdown_grace;
        self
    }

    pub fn failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.config.failure_policy = failure_policy;
        self
    }

    /// Replace the whole run configuration.
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }
}

impl<S, SF, SE, L, LF, R, E> Future for Scenario<S, L>
where
    S: Fn() -> SF + Send + Sync + 'static + Clone,
    SF: Future<Output = Result<u16, SE>> + Send + 'static,
    SE: Display + 'static,
    L: Fn() -> LF + Send + Sync + 'static + Clone,
    LF: Future<Output = Result<R, E>> + Send + 'static,
    R: 'static,
    E: Display + 'static,
{
    type Output = Result<ScenarioReport, BenchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let runner = this.runner_fut.get_or_insert_with(|| {
            let settings = Settings {
                name: this.name.clone(),
                threshold: *this.threshold,
                expected_status: *this.expected_status,
                config: this.config.clone(),
            };
            Box::pin(evaluate(this.sentinel.clone(), this.load.clone(), settings))
        });
        runner.as_mut().poll(cx)
    }
}

struct Settings {
    name: String,
    threshold: Duration,
    expected_status: u16,
    config: RunConfig,
}

/// Result of a passing scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub statistics: RunStatistics,
    pub mean_latency: Duration,
    pub threshold: Duration,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.statistics)?;
        write!(
            f,
            "{}: PASS (mean {}ms <= threshold {}ms)",
            self.name,
            self.mean_latency.as_millis(),
            self.threshold.as_millis()
        )
    }
}

#[instrument(name = "scenario", skip_all, fields(name = %settings.name))]
async fn evaluate<S, SF, SE, L, LF, R, E>(
    sentinel: S,
    load: L,
    settings: Settings,
) -> Result<ScenarioReport, BenchError>
where
    S: Fn() -> SF,
    SF: Future<Output = Result<u16, SE>>,
    SE: Display,
    L: Fn() -> LF + Send + Sync + 'static + Clone,
    LF: Future<Output = Result<R, E>> + Send + 'static,
    R: 'static,
    E: Display + 'static,
{
    let Settings {
        name,
        threshold,
        expected_status,
        config,
    } = settings;
    info!("Running {name} with config {config}");

    check_sentinel(&name, sentinel().await.map_err(|e| e.to_string()), expected_status)?;
    debug!("Sentinel request returned {expected_status}.");

    let statistics = Coordinator::new(&name, load, config).run().await?;
    info!(
        "Run complete: {} requests, {} failures, {:.2} req/s, error rate {:.2}",
        statistics.request_count,
        statistics.failure_count,
        statistics.throughput(),
        statistics.error_rate(),
    );
    info!("\n{statistics}");

    let (Some(mean_latency), Some(mean_millis)) =
        (statistics.mean_latency(), statistics.mean_latency_millis())
    else {
        return Err(BenchError::NoCompletedRequests {
            scenario: name,
            failures: statistics.failure_count,
            aborted_workers: statistics.aborted_workers,
            unfinished_workers: statistics.unfinished_workers,
        });
    };

    check_threshold(&name, mean_latency, mean_millis, threshold)?;

    Ok(ScenarioReport {
        name,
        statistics,
        mean_latency,
        threshold,
    })
}

fn check_sentinel(name: &str, res: Result<u16, String>, expected: u16) -> Result<(), BenchError> {
    let actual = match res {
        Ok(status) if status == expected => return Ok(()),
        Ok(status) => SentinelFailure::Status(status),
        Err(err) => SentinelFailure::Transport(err),
    };
    error!("Sentinel request failed with {actual}.");
    Err(BenchError::Precondition {
        scenario: name.to_string(),
        expected,
        actual,
    })
}

/// The SLO is checked on the mean truncated to whole milliseconds. `mean` is only carried into
/// the error for reporting.
fn check_threshold(
    name: &str,
    mean: Duration,
    mean_millis: u64,
    threshold: Duration,
) -> Result<(), BenchError> {
    if u128::from(mean_millis) > threshold.as_millis() {
        error!("Mean latency {mean:?} exceeds {threshold:?}.");
        Err(BenchError::SloViolation {
            scenario: name.to_string(),
            mean,
            threshold,
        })
    } else {
        Ok(())
    }
}
