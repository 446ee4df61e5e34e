use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod model;
pub use model::{CallOutcome, FailedLevel, PassSummary, RateLevel, ScheduledCall, SweepReport};

/// Host suffix of the Tutamen deployment the harness targets by default.
pub const DEFAULT_BASE_HOST: &str = "tutamen.vrg1.aws.volaticus.net";

/// Headroom window used to size the worker pool: `capacity = rate * window`.
pub const DEFAULT_MIN_WINDOW: Duration = Duration::from_secs(1);

/// Failure of a single workload call. Recorded in the call's outcome and never
/// propagated past the timing wrapper.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkloadError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Operation requires a client certificate but none was configured")]
    MissingIdentity,

    #[error("Call did not complete within {0:?}")]
    TimedOut(Duration),

    #[error("Call panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

/// Rejected pass setup. Fatal to the sweep.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("rate must be positive, got {0}")]
    NonPositiveRate(f64),

    #[error("rate must be a finite number")]
    NonFiniteRate,

    #[error("duration must be non-zero")]
    ZeroDuration,
}

/// A pass produced no outcomes, so its statistics are undefined.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum AggregationError {
    #[error("rate level {rate} ops/s completed no calls; latency statistics are undefined")]
    EmptyPass { rate: f64 },
}

/// Setup failures raised before any pass runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown workload: {0}")]
    UnknownWorkload(String),

    #[error("Workload {workload} requires argument: {argument}")]
    MissingArgument { workload: String, argument: String },

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid client identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid service configuration: {0}")]
    InvalidEndpoints(String),

    #[error("Workload setup failed: {0}")]
    Setup(String),
}

/// The only error that terminates a sweep.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SweepError {
    #[error("Invalid rate range: {0}")]
    InvalidRange(String),

    #[error("rate level {rate} ops/s: {source}")]
    Scheduling {
        rate: f64,
        #[source]
        source: SchedulingError,
    },

    #[error("rate level {rate} ops/s aborted the sweep: {source}")]
    Aggregation {
        rate: f64,
        #[source]
        source: AggregationError,
    },

    #[error("Output sink failed: {0}")]
    Sink(String),
}

/// Addresses (`host[:port]`) of the access-control and storage servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    pub acs_addr: String,
    pub ss_addr: String,
}

impl ServiceEndpoints {
    /// Derive both addresses from a shared base host: `acs.<base>` and `ss.<base>`.
    pub fn from_base(base: &str) -> Self {
        Self {
            acs_addr: format!("acs.{base}"),
            ss_addr: format!("ss.{base}"),
        }
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self::from_base(DEFAULT_BASE_HOST)
    }
}

/// Result type for workload calls
pub type Result<T> = std::result::Result<T, WorkloadError>;
