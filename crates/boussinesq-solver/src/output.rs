//! Per-step reports and the writers that consume them.

use nalgebra::DVector;

use crate::error::Result;
use crate::newton::NewtonMetrics;

/// Everything known about the state after one time step.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Step index, starting at 1.
    pub step: usize,
    /// Simulated time at the end of the step (s).
    pub time: f64,
    /// Converged head (m).
    pub head: DVector<f64>,
    /// Saturated thickness (m).
    pub thickness: DVector<f64>,
    /// Cell volume as entered in the ledger (m^3).
    pub volume: DVector<f64>,
    /// Volumetric source (m^3/s).
    pub source: DVector<f64>,
    /// Work done by the Newton solve.
    pub metrics: NewtonMetrics,
    /// Total volume before the first step (m^3).
    pub initial_volume: f64,
    /// Sum of `volume` (m^3).
    pub total_volume: f64,
    /// Whether `total_volume` drifted from `initial_volume` beyond the threshold.
    pub conservation_violated: bool,
}

/// Sink for step reports.
pub trait OutputWriter {
    /// Consume the report of a completed step.
    fn write_step(&mut self, report: &StepReport) -> Result<()>;

    /// Called once after the last step.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes a one-line summary of every step through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogWriter;

impl OutputWriter for LogWriter {
    fn write_step(&mut self, report: &StepReport) -> Result<()> {
        let (min, max) = report
            .head
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        log::info!(
            "step {} t={} s: head in [{:.6}, {:.6}] m, volume {:.6e} m^3",
            report.step,
            report.time,
            min,
            max,
            report.total_volume
        );
        Ok(())
    }
}

/// Keeps every report in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingWriter {
    reports: Vec<StepReport>,
    finished: bool,
}

impl RecordingWriter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports received so far.
    pub fn reports(&self) -> &[StepReport] {
        &self.reports
    }

    /// Whether `finish` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Head history, one `(time, head)` pair per step.
    pub fn head_history(&self) -> Vec<(f64, &DVector<f64>)> {
        self.reports.iter().map(|r| (r.time, &r.head)).collect()
    }

    /// Take the recorded reports.
    pub fn into_reports(self) -> Vec<StepReport> {
        self.reports
    }
}

impl OutputWriter for RecordingWriter {
    fn write_step(&mut self, report: &StepReport) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
