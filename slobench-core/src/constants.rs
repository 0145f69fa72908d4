use std::time::Duration;

/// Number of concurrent workers used when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Pause between launching the workers and releasing them.
pub const DEFAULT_WARMUP: Duration = Duration::from_millis(1_000);

/// Length of the measurement window.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(10_000);

/// How long the coordinator waits for in-flight requests after the window closes.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(10_000);

/// Status the sentinel request has to return before a run is started.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// The default mean latency threshold used for single-entity lookups.
pub const DEFAULT_LATENCY_THRESHOLD: Duration = Duration::from_millis(100);
