use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{AggregationError, SchedulingError, WorkloadError};

/// One step of a sweep: a target rate held for a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLevel {
    rate: f64,
    duration: Duration,
}

impl RateLevel {
    /// Validate and build a level. Every later computation divides by `rate`,
    /// so non-positive or non-finite rates are rejected here.
    pub fn new(rate: f64, duration: Duration) -> Result<Self, SchedulingError> {
        if !rate.is_finite() {
            return Err(SchedulingError::NonFiniteRate);
        }
        if rate <= 0.0 {
            return Err(SchedulingError::NonPositiveRate(rate));
        }
        if duration.is_zero() {
            return Err(SchedulingError::ZeroDuration);
        }
        Ok(Self { rate, duration })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// `round(rate * duration)`
    pub fn call_count(&self) -> usize {
        (self.rate * self.duration.as_secs_f64()).round() as usize
    }

    pub fn inter_arrival(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate)
    }

    /// Concurrent workers for this level: `round(rate * min_window)`, at least one.
    /// Independent of the level's duration.
    pub fn pool_capacity(&self, min_window: Duration) -> usize {
        ((self.rate * min_window.as_secs_f64()).round() as usize).max(1)
    }

    /// Dispatch offset of call `index` from pass start: `index / rate`,
    /// rounded to the nearest nanosecond.
    pub fn target_offset(&self, index: usize) -> Duration {
        Duration::from_nanos((index as f64 * 1e9 / self.rate).round() as u64)
    }
}

/// A call slot within one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledCall {
    pub index: usize,
    pub target_offset: Duration,
}

/// What one scheduled call produced. Exactly one per `ScheduledCall`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub index: usize,
    /// Time spent inside the workload call.
    pub elapsed: Duration,
    /// Time the call waited for a free worker after dispatch.
    pub queue_delay: Duration,
    /// When the outcome arrived, relative to pass start.
    pub completed_at: Duration,
    pub error: Option<WorkloadError>,
}

impl CallOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Statistics for one completed pass. Latencies are serialized as seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub rate_requested: f64,
    pub calls_completed: usize,
    pub calls_failed: usize,
    #[serde(with = "duration_secs")]
    pub wall_time: Duration,
    pub achieved_rate: f64,
    #[serde(with = "duration_secs")]
    pub mean_latency: Duration,
    #[serde(with = "duration_secs")]
    pub stddev_latency: Duration,
    #[serde(with = "duration_secs")]
    pub min_latency: Duration,
    #[serde(with = "duration_secs")]
    pub max_latency: Duration,
    #[serde(with = "duration_secs")]
    pub p50_latency: Duration,
    #[serde(with = "duration_secs")]
    pub p99_latency: Duration,
    #[serde(with = "duration_secs")]
    pub mean_queue_delay: Duration,
}

/// A rate level that produced no calls and was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedLevel {
    pub rate: f64,
    pub error: AggregationError,
}

/// Everything a sweep produced, in ascending rate order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub summaries: Vec<PassSummary>,
    pub failed_levels: Vec<FailedLevel>,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
