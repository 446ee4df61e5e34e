use ratesweep_common::{RateLevel, ScheduledCall, SchedulingError};
use std::time::Duration;
use tokio::time::Instant;

/// Open-loop dispatch plan for one pass.
///
/// Call `i` is due at `start + i / rate`. The plan depends only on the rate:
/// a call that is still in flight never delays or advances the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    level: RateLevel,
}

impl Schedule {
    pub fn new(level: RateLevel) -> Self {
        Self { level }
    }

    /// Validate `rate`/`duration` and build the schedule.
    pub fn try_new(rate: f64, duration: Duration) -> Result<Self, SchedulingError> {
        Ok(Self::new(RateLevel::new(rate, duration)?))
    }

    pub fn level(&self) -> &RateLevel {
        &self.level
    }

    pub fn call_count(&self) -> usize {
        self.level.call_count()
    }

    /// Every call slot of the pass, in index order.
    pub fn calls(&self) -> impl Iterator<Item = ScheduledCall> + '_ {
        (0..self.call_count()).map(|index| ScheduledCall {
            index,
            target_offset: self.level.target_offset(index),
        })
    }

    /// Pacing loop. Sleeps until each call is due, then hands it to `dispatch`.
    ///
    /// A call that is already late is dispatched immediately; lateness is not
    /// made up with a burst. `dispatch` runs on the pacing task and must not
    /// block. Returns the number of dispatched calls.
    pub async fn run<D>(&self, start: Instant, mut dispatch: D) -> usize
    where
        D: FnMut(ScheduledCall),
    {
        let mut dispatched = 0;
        for call in self.calls() {
            let due = start + call.target_offset;
            if Instant::now() < due {
                tokio::time::sleep_until(due).await;
            }
            dispatch(call);
            dispatched += 1;
        }
        tracing::trace!(rate = self.level.rate(), dispatched, "pacing loop finished");
        dispatched
    }
}

/// Pace `round(rate * duration)` calls starting now.
pub async fn run<D>(rate: f64, duration: Duration, dispatch: D) -> Result<usize, SchedulingError>
where
    D: FnMut(ScheduledCall),
{
    let schedule = Schedule::try_new(rate, duration)?;
    Ok(schedule.run(Instant::now(), dispatch).await)
}
