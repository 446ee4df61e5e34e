use ratesweep_common::{AggregationError, CallOutcome, PassSummary, RateLevel};
use std::time::Duration;

// A single instant call on a paused clock can arrive at offset zero.
const MIN_WALL_TIME: Duration = Duration::from_nanos(1);

/// Reduce one pass's outcomes to its summary.
///
/// Outcomes may be in any order. Failed calls count toward every statistic.
/// `wall_time` runs from pass start to the last outcome's arrival, so a fast
/// workload can finish before the pacing window closes and report an
/// `achieved_rate` above the requested one.
pub fn summarize(level: &RateLevel, outcomes: &[CallOutcome]) -> Result<PassSummary, AggregationError> {
    if outcomes.is_empty() {
        return Err(AggregationError::EmptyPass { rate: level.rate() });
    }

    let calls_completed = outcomes.len();
    let calls_failed = outcomes.iter().filter(|o| o.failed()).count();
    let wall_time = outcomes.iter().map(|o| o.completed_at).max().unwrap_or_default();

    let latencies: Vec<Duration> = outcomes.iter().map(|o| o.elapsed).collect();
    let (mean, stddev) = mean_and_pstdev(&latencies);
    let queue_delays: Vec<Duration> = outcomes.iter().map(|o| o.queue_delay).collect();
    let (mean_queue_delay, _) = mean_and_pstdev(&queue_delays);

    Ok(PassSummary {
        rate_requested: level.rate(),
        calls_completed,
        calls_failed,
        wall_time,
        achieved_rate: calls_completed as f64 / wall_time.max(MIN_WALL_TIME).as_secs_f64(),
        mean_latency: mean,
        stddev_latency: stddev,
        min_latency: latencies.iter().copied().min().unwrap_or_default(),
        max_latency: latencies.iter().copied().max().unwrap_or_default(),
        p50_latency: percentile(&latencies, 0.50),
        p99_latency: percentile(&latencies, 0.99),
        mean_queue_delay,
    })
}

/// Arithmetic mean and population standard deviation (divisor `n`).
/// Callers guarantee a non-empty sample.
fn mean_and_pstdev(samples: &[Duration]) -> (Duration, Duration) {
    let n = samples.len() as f64;
    let secs: Vec<f64> = samples.iter().map(Duration::as_secs_f64).collect();
    let mean = secs.iter().sum::<f64>() / n;
    let variance = secs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (Duration::from_secs_f64(mean), Duration::from_secs_f64(variance.sqrt()))
}

/// Sort `data` ascending and return the element at index `floor(p * n)`.
/// Returns zero for an empty slice.
pub fn percentile(data: &[Duration], p: f64) -> Duration {
    if data.is_empty() {
        return Duration::ZERO;
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable();
    let idx = (p * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
