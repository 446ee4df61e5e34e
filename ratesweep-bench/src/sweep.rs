use ratesweep_common::{
    CallOutcome, FailedLevel, RateLevel, SweepError, SweepReport,
};
use std::sync::Arc;
use tokio::time::Instant;

use crate::aggregate::summarize;
use crate::config::{EmptyPassPolicy, SweepConfig};
use crate::pool::WorkerPool;
use crate::report::SummarySink;
use crate::scheduler::Schedule;
use crate::workload::Workload;

/// Lifecycle of a sweep. The four per-level states repeat once per rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Idle,
    Warmup,
    Scheduling,
    Dispatching,
    Collecting,
    Reporting,
    Done,
}

/// Runs one pass per rate level, in ascending order, and streams the summaries.
pub struct Sweep {
    config: SweepConfig,
    workload: Arc<dyn Workload>,
    state: SweepState,
}

impl Sweep {
    pub fn new(config: SweepConfig, workload: Arc<dyn Workload>) -> Self {
        Self { config, workload, state: SweepState::Idle }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    fn enter(&mut self, state: SweepState) {
        tracing::debug!(from = ?self.state, to = ?state, "sweep state");
        self.state = state;
    }

    fn level(&self, rate: f64) -> Result<RateLevel, SweepError> {
        RateLevel::new(rate, self.config.duration)
            .map_err(|source| SweepError::Scheduling { rate, source })
    }

    /// Run the whole sweep.
    ///
    /// Each pass finishes (every call has an outcome) before the next starts.
    /// A bad rate aborts before any call of that level is dispatched. A level
    /// with no calls is reported to `sink` and then aborts or is skipped per
    /// [`EmptyPassPolicy`].
    pub async fn run(&mut self, sink: &mut dyn SummarySink) -> Result<SweepReport, SweepError> {
        let rates = self.config.range.levels()?;
        let mut report = SweepReport::default();

        if self.config.warmup {
            self.enter(SweepState::Warmup);
            let level = self.level(self.config.range.start)?;
            tracing::info!(rate = level.rate(), "warming up");
            let outcomes = self.run_pass(&level, false).await;
            if let Err(e) = summarize(&level, &outcomes) {
                tracing::warn!(error = %e, "warm-up pass produced no calls");
            }
        }

        tracing::info!(
            start = self.config.range.start,
            end = self.config.range.end,
            step = self.config.range.step,
            workload = self.workload.name(),
            "benchmarking"
        );
        for rate in rates {
            self.enter(SweepState::Scheduling);
            let level = self.level(rate)?;
            let outcomes = self.run_pass(&level, true).await;

            match summarize(&level, &outcomes) {
                Ok(summary) => {
                    self.enter(SweepState::Reporting);
                    tracing::info!(
                        rate,
                        calls = summary.calls_completed,
                        failed = summary.calls_failed,
                        achieved = summary.achieved_rate,
                        "pass complete"
                    );
                    sink.on_summary(&summary).map_err(|e| SweepError::Sink(e.to_string()))?;
                    report.summaries.push(summary);
                }
                Err(source) => {
                    self.enter(SweepState::Reporting);
                    tracing::error!(error = %source, "pass failed");
                    sink.on_failed_level(rate, &source)
                        .map_err(|e| SweepError::Sink(e.to_string()))?;
                    match self.config.on_empty_pass {
                        EmptyPassPolicy::Abort => {
                            return Err(SweepError::Aggregation { rate, source });
                        }
                        EmptyPassPolicy::Continue => {
                            report.failed_levels.push(FailedLevel { rate, error: source });
                        }
                    }
                }
            }
        }

        self.enter(SweepState::Done);
        Ok(report)
    }

    /// One pass: pace the level's calls onto a fresh pool, then wait for
    /// every outcome.
    async fn run_pass(&mut self, level: &RateLevel, measured: bool) -> Vec<CallOutcome> {
        let schedule = Schedule::new(*level);
        let capacity = level.pool_capacity(self.config.min_window);
        let start = Instant::now();
        let mut pool = WorkerPool::new(capacity, start, self.config.call_timeout);
        tracing::debug!(
            rate = level.rate(),
            calls = schedule.call_count(),
            capacity,
            "starting pass"
        );

        if measured {
            self.enter(SweepState::Dispatching);
        }
        let workload = &self.workload;
        schedule.run(start, |call| pool.submit(call, workload.clone())).await;

        if measured {
            self.enter(SweepState::Collecting);
        }
        pool.drain().await
    }
}
