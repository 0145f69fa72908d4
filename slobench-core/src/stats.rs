use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::fmt;
use std::ops::AddAssign;
use std::time::Duration;

/// Counts accumulated by a single worker over its part of the run.
///
/// Only successful requests contribute to `elapsed`, so the mean latency is not skewed by
/// requests which failed fast at the transport level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerResult {
    pub request_count: u64,
    pub failure_count: u64,
    pub elapsed: Duration,
}

impl WorkerResult {
    pub fn record_success(&mut self, elapsed: Duration) {
        self.request_count += 1;
        self.elapsed += elapsed;
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    pub fn total(&self) -> u64 {
        self.request_count + self.failure_count
    }
}

impl AddAssign for WorkerResult {
    fn add_assign(&mut self, other: Self) {
        self.request_count += other.request_count;
        self.failure_count += other.failure_count;
        self.elapsed += other.elapsed;
    }
}

/// How a worker left its loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Completed(WorkerResult),
    Aborted { partial: WorkerResult, error: String },
}

/// Aggregate statistics for a single run.
#[serde_as]
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Number of workers launched.
    pub workers: usize,
    pub completed_workers: usize,
    /// Workers which stopped early on a failed request. Their counts are not included.
    pub aborted_workers: usize,
    /// Workers still running (or panicked) once the shutdown grace period ran out.
    pub unfinished_workers: usize,
    pub request_count: u64,
    pub failure_count: u64,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub total_elapsed: Duration,
    /// Wall-clock length of the measurement window.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub window: Duration,
}

impl RunStatistics {
    pub fn new(workers: usize, window: Duration) -> Self {
        Self {
            workers,
            window,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &WorkerOutcome) {
        match outcome {
            WorkerOutcome::Completed(result) => self.merge(result),
            WorkerOutcome::Aborted { .. } => self.aborted_workers += 1,
        }
    }

    pub fn record_unfinished(&mut self) {
        self.unfinished_workers += 1;
    }

    /// Merge a completed worker's counts into the totals.
    pub fn merge(&mut self, result: &WorkerResult) {
        self.completed_workers += 1;
        self.request_count += result.request_count;
        self.failure_count += result.failure_count;
        self.total_elapsed += result.elapsed;
    }

    /// Mean latency of the successful requests. `None` when no request completed.
    pub fn mean_latency(&self) -> Option<Duration> {
        self.total_elapsed
            .as_nanos()
            .checked_div(self.request_count as u128)
            .map(|nanos| Duration::from_nanos(nanos as u64))
    }

    /// Mean latency truncated to whole milliseconds.
    pub fn mean_latency_millis(&self) -> Option<u64> {
        (self.total_elapsed.as_millis() as u64).checked_div(self.request_count)
    }

    /// Successful requests per second over the measurement window.
    pub fn throughput(&self) -> f64 {
        if self.window.is_zero() {
            return 0.;
        }
        self.request_count as f64 / self.window.as_secs_f64()
    }

    pub fn error_rate(&self) -> f64 {
        let total = self.request_count + self.failure_count;
        if total == 0 {
            return 0.;
        }
        self.failure_count as f64 / total as f64
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total request count: {}", self.request_count)?;
        writeln!(f, "Total elapsed time: {}ms", self.total_elapsed.as_millis())?;
        match self.mean_latency_millis() {
            Some(mean) => write!(f, "Average elapsed time: {mean}ms"),
            None => write!(f, "Average elapsed time: n/a"),
        }
    }
}
