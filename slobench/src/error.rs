use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Reasons a scenario fails.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Invalid run configuration: {0}")]
    InvalidConfig(&'static str),

    /// The sentinel request did not succeed, so the measurement window was never entered.
    #[error(
        "Sentinel request for {scenario} failed (expected status {expected}, got {actual}). \
         Check that the target service is running."
    )]
    Precondition {
        scenario: String,
        expected: u16,
        actual: SentinelFailure,
    },

    #[error(
        "No request completed for {scenario} ({failures} failed, {aborted_workers} workers aborted, \
         {unfinished_workers} workers unfinished)"
    )]
    NoCompletedRequests {
        scenario: String,
        failures: u64,
        aborted_workers: usize,
        unfinished_workers: usize,
    },

    #[error("Mean latency of {scenario} is {mean:?}, above the threshold of {threshold:?}")]
    SloViolation {
        scenario: String,
        mean: Duration,
        threshold: Duration,
    },
}

/// What the sentinel request returned instead of the expected status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentinelFailure {
    Status(u16),
    Transport(String),
}

impl fmt::Display for SentinelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentinelFailure::Status(status) => write!(f, "status {status}"),
            SentinelFailure::Transport(err) => write!(f, "transport error: {err}"),
        }
    }
}
