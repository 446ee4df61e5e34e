//! Open-loop rate sweep harness.
//!
//! A [`sweep::Sweep`] walks a range of target rates. For every rate it paces
//! calls with a [`scheduler::Schedule`], runs them on a per-pass
//! [`pool::WorkerPool`], times each one with [`timed::invoke`], and reduces
//! the outcomes to a [`ratesweep_common::PassSummary`] with
//! [`aggregate::summarize`]. Summaries are streamed to a
//! [`report::SummarySink`] as each pass finishes.

pub mod aggregate;
pub mod config;
pub mod pool;
pub mod report;
pub mod scheduler;
pub mod sweep;
pub mod timed;
pub mod workload;

pub use config::{EmptyPassPolicy, RateRange, SweepConfig};
pub use sweep::{Sweep, SweepState};
pub use workload::{Workload, WorkloadKind};
