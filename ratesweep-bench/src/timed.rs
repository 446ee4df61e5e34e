use futures::FutureExt;
use ratesweep_common::WorkloadError;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::Instant;

use crate::workload::Workload;

/// Await `fut` and return its output together with how long it took.
pub async fn timed<F: Future>(fut: F) -> (F::Output, Duration) {
    let start = Instant::now();
    let output = fut.await;
    (output, start.elapsed())
}

/// Run one workload call and time it.
///
/// Never fails: an `Err`, a panic, or an expired `call_timeout` are all
/// returned as a `WorkloadError` alongside the elapsed time and logged as a
/// warning. Siblings in the same pass are unaffected.
pub async fn invoke(
    workload: &dyn Workload,
    index: usize,
    call_timeout: Option<Duration>,
) -> (Result<(), WorkloadError>, Duration) {
    let call = AssertUnwindSafe(workload.call()).catch_unwind();

    let (result, elapsed) = match call_timeout {
        None => {
            let (caught, elapsed) = timed(call).await;
            (flatten_panic(caught), elapsed)
        }
        Some(limit) => {
            let (caught, elapsed) = timed(tokio::time::timeout(limit, call)).await;
            match caught {
                Ok(caught) => (flatten_panic(caught), elapsed),
                Err(_) => (Err(WorkloadError::TimedOut(limit)), elapsed),
            }
        }
    };

    if let Err(e) = &result {
        tracing::warn!(workload = workload.name(), index, error = %e, "call failed");
    }
    (result, elapsed)
}

fn flatten_panic(
    caught: Result<Result<(), WorkloadError>, Box<dyn Any + Send>>,
) -> Result<(), WorkloadError> {
    match caught {
        Ok(result) => result,
        Err(payload) => Err(WorkloadError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
