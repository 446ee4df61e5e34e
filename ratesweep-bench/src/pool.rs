use ratesweep_common::{CallOutcome, ScheduledCall, WorkloadError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::timed::invoke;
use crate::workload::Workload;

/// Bounded executor for one pass.
///
/// At most `capacity` calls run at once. Submitting never waits: a call that
/// finds every worker busy queues for a slot, and the wait is reported as the
/// outcome's `queue_delay`. The pool is consumed by [`WorkerPool::drain`], so
/// it cannot outlive its pass.
pub struct WorkerPool {
    capacity: usize,
    slots: Arc<Semaphore>,
    tasks: JoinSet<CallOutcome>,
    submitted: usize,
    start: Instant,
    call_timeout: Option<Duration>,
}

impl WorkerPool {
    /// `start` is the pass start that outcome arrival times are measured from.
    /// `capacity` is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(capacity: usize, start: Instant, call_timeout: Option<Duration>) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            tasks: JoinSet::new(),
            submitted: 0,
            start,
            call_timeout,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Calls currently executing (queued calls excluded).
    pub fn busy(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Queue `call` for execution. Returns immediately.
    pub fn submit(&mut self, call: ScheduledCall, workload: Arc<dyn Workload>) {
        let slots = self.slots.clone();
        let start = self.start;
        let call_timeout = self.call_timeout;
        self.tasks.spawn(async move {
            let queued_at = Instant::now();
            // The semaphore is never closed, so acquiring cannot fail.
            let _slot = slots.acquire_owned().await.ok();
            let queue_delay = queued_at.elapsed();

            let (result, elapsed) = invoke(workload.as_ref(), call.index, call_timeout).await;
            CallOutcome {
                index: call.index,
                elapsed,
                queue_delay,
                completed_at: start.elapsed(),
                error: result.err(),
            }
        });
        self.submitted += 1;
    }

    /// Wait for every submitted call and return one outcome per call, in index order.
    ///
    /// This is the pass's only barrier. A worker task that ended without an
    /// outcome still gets a failed entry, so the result always has one entry
    /// per submitted call.
    pub async fn drain(mut self) -> Vec<CallOutcome> {
        let mut slots: Vec<Option<CallOutcome>> = vec![None; self.submitted];

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(outcome) => match slots.get_mut(outcome.index) {
                    Some(slot) => *slot = Some(outcome),
                    None => tracing::error!(index = outcome.index, "outcome for unknown call index"),
                },
                Err(e) => tracing::error!(error = %e, "worker task aborted"),
            }
        }

        let drained_at = self.start.elapsed();
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| CallOutcome {
                    index,
                    elapsed: Duration::ZERO,
                    queue_delay: Duration::ZERO,
                    completed_at: drained_at,
                    error: Some(WorkloadError::Panicked("worker task ended without an outcome".to_string())),
                })
            })
            .collect()
    }
}
