use ratesweep_common::{AggregationError, FailedLevel, PassSummary};
use std::io::{self, Write};

/// Receives results as each pass finishes.
pub trait SummarySink {
    fn on_summary(&mut self, summary: &PassSummary) -> io::Result<()>;

    /// A level produced no calls, so it has no summary.
    fn on_failed_level(&mut self, rate: f64, error: &AggregationError) -> io::Result<()>;
}

/// Fixed-width table, one row per pass:
///
/// ```text
///  cnt | total |  iops  | latavg | latstd | failed | qdelay
///   20 |   2.0 |   10.0 |  0.012 |  0.003 |      0 |  0.000
/// ```
///
/// `total`, `latavg`, `latstd` and `qdelay` are in seconds. `latavg` is
/// service time only; `qdelay` is the mean wait for a free worker, which
/// grows once the pool saturates.
pub struct TableSink<W: Write> {
    out: W,
    header_written: bool,
}

impl<W: Write> TableSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, header_written: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn header(&mut self) -> io::Result<()> {
        if !self.header_written {
            writeln!(self.out, " cnt | total |  iops  | latavg | latstd | failed | qdelay")?;
            self.header_written = true;
        }
        Ok(())
    }
}

impl<W: Write> SummarySink for TableSink<W> {
    fn on_summary(&mut self, s: &PassSummary) -> io::Result<()> {
        self.header()?;
        writeln!(
            self.out,
            "{:4} | {:5.1} | {:6.1} | {:6.3} | {:6.3} | {:6} | {:6.3}",
            s.calls_completed,
            s.wall_time.as_secs_f64(),
            s.achieved_rate,
            s.mean_latency.as_secs_f64(),
            s.stddev_latency.as_secs_f64(),
            s.calls_failed,
            s.mean_queue_delay.as_secs_f64(),
        )?;
        self.out.flush()
    }

    fn on_failed_level(&mut self, _rate: f64, error: &AggregationError) -> io::Result<()> {
        self.header()?;
        writeln!(self.out, "{:>4} | {}", "-", error)?;
        self.out.flush()
    }
}

/// One JSON object per line: a `PassSummary`, or a `FailedLevel` for skipped levels.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SummarySink for JsonLinesSink<W> {
    fn on_summary(&mut self, summary: &PassSummary) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, summary)?;
        writeln!(self.out)?;
        self.out.flush()
    }

    fn on_failed_level(&mut self, rate: f64, error: &AggregationError) -> io::Result<()> {
        let failed = FailedLevel { rate, error: error.clone() };
        serde_json::to_writer(&mut self.out, &failed)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub summaries: Vec<PassSummary>,
    pub failed_levels: Vec<FailedLevel>,
}

impl SummarySink for VecSink {
    fn on_summary(&mut self, summary: &PassSummary) -> io::Result<()> {
        self.summaries.push(summary.clone());
        Ok(())
    }

    fn on_failed_level(&mut self, rate: f64, error: &AggregationError) -> io::Result<()> {
        self.failed_levels.push(FailedLevel { rate, error: error.clone() });
        Ok(())
    }
}
