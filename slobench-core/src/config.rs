use crate::{DEFAULT_CONCURRENCY, DEFAULT_DURATION, DEFAULT_SHUTDOWN_GRACE, DEFAULT_WARMUP};
use humantime::format_duration;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::fmt;
use std::time::Duration;

/// What a worker does when a single request fails.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Count the failure separately and keep issuing requests.
    #[default]
    Count,
    /// Stop the worker on its first failure. Its partial result is dropped from the aggregate and
    /// the worker is reported as aborted.
    Abort,
}

/// Parameters of a single coordinated run.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub concurrency: usize,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub warmup: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub shutdown_grace: Duration,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl RunConfig {
    pub fn new() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            warmup: DEFAULT_WARMUP,
            duration: DEFAULT_DURATION,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }

    pub fn failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Rejects configurations which can never produce a measurement.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.concurrency == 0 {
            return Err("concurrency must be greater than zero");
        }
        if self.duration.is_zero() {
            return Err("duration must be greater than zero");
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "concurrency={}, warmup={}, duration={}, shutdown_grace={}, failures={:?}",
            self.concurrency,
            format_duration(self.warmup),
            format_duration(self.duration),
            format_duration(self.shutdown_grace),
            self.failure_policy,
        )
    }
}
