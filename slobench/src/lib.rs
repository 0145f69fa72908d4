#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod coordinator;
pub mod scenario;

mod error;
mod worker;

pub use coordinator::Coordinator;
pub use error::{BenchError, SentinelFailure};
pub use scenario::{Scenario, ScenarioReport};

#[doc(hidden)]
pub use slobench_core as core;

pub mod prelude {
    pub use crate::coordinator::Coordinator;
    pub use crate::error::{BenchError, SentinelFailure};
    pub use crate::scenario::{Scenario, ScenarioReport};

    pub use slobench_core::{FailurePolicy, RunConfig, RunStatistics};
}
