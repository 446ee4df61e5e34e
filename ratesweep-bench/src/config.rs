use ratesweep_common::{ConfigError, ServiceEndpoints, SweepError, DEFAULT_MIN_WINDOW};
use std::path::Path;
use std::time::Duration;

/// What the sweep does when a level produces no calls (`round(rate * duration) == 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPassPolicy {
    #[default]
    Abort,
    /// Record the level as failed and move on to the next rate.
    Continue,
}

/// Rates `start, start + step, ...` strictly below `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl RateRange {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    /// The range's rate levels, ascending, produced on demand.
    ///
    /// Only the shape of the range is checked here; a non-positive rate inside
    /// it is rejected by the scheduler when that level is reached.
    pub fn levels(&self) -> Result<RateLevels, SweepError> {
        if !(self.start.is_finite() && self.end.is_finite() && self.step.is_finite()) {
            return Err(SweepError::InvalidRange("bounds and step must be finite".to_string()));
        }
        if self.step <= 0.0 {
            return Err(SweepError::InvalidRange(format!("step must be positive, got {}", self.step)));
        }
        Ok(RateLevels { range: *self, next: 0, done: false })
    }
}

/// Iterator over `start + k * step` for `k = 0, 1, ...` while below `end`.
#[derive(Debug, Clone)]
pub struct RateLevels {
    range: RateRange,
    next: u64,
    done: bool,
}

impl Iterator for RateLevels {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.done {
            return None;
        }
        // start + k * step, not a running sum.
        let rate = self.range.start + self.next as f64 * self.range.step;
        if rate >= self.range.end || self.next == u64::MAX {
            self.done = true;
            return None;
        }
        self.next += 1;
        Some(rate)
    }

    fn nth(&mut self, n: usize) -> Option<f64> {
        if !self.done {
            self.next = self.next.saturating_add(n as u64);
        }
        self.next()
    }
}

/// Everything the sweep controller needs; passed in at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub range: RateRange,
    /// How long each pass paces calls.
    pub duration: Duration,
    /// Headroom window sizing each pass's worker pool (`rate * min_window`).
    pub min_window: Duration,
    /// Run a discarded pass at the start rate before measuring.
    pub warmup: bool,
    /// `None` waits for every call however long it takes.
    pub call_timeout: Option<Duration>,
    pub on_empty_pass: EmptyPassPolicy,
}

impl SweepConfig {
    pub fn new(range: RateRange, duration: Duration) -> Self {
        Self {
            range,
            duration,
            min_window: DEFAULT_MIN_WINDOW,
            warmup: true,
            call_timeout: None,
            on_empty_pass: EmptyPassPolicy::default(),
        }
    }
}

/// Load service addresses from a JSON file (`{"acs_addr": ..., "ss_addr": ...}`).
pub fn load_endpoints(path: &Path) -> Result<ServiceEndpoints, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidEndpoints(e.to_string()))
}
