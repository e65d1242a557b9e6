//! Per-cell outputs and the global water-volume ledger.

use boussinesq_core::{Aquifer, wet};
use nalgebra::DVector;

use crate::assembly::drainage;

/// Per-cell quantities derived from a converged head.
#[derive(Debug, Clone, PartialEq)]
pub struct CellOutputs {
    /// Saturated thickness `max(0, eta - z)` (m).
    pub thickness: DVector<f64>,
    /// Volumetric source `source * area` (m^3/s).
    pub source: DVector<f64>,
    /// Stored volume with the step's source removed and its drainage added
    /// back (m^3).
    pub volume: DVector<f64>,
    /// Sum of `volume`.
    pub total_volume: f64,
}

impl CellOutputs {
    /// Evaluate the outputs for head `eta` at the end of a step of length `dt`.
    pub fn compute(aquifer: &Aquifer, eta: &DVector<f64>, dt: f64) -> Self {
        let cells = aquifer.cells();
        let n = aquifer.num_cells();

        let thickness = DVector::from_fn(n, |i, _| wet::thickness(eta[i], cells.bedrock[i]));
        let source = DVector::from_fn(n, |i, _| cells.source[i] * cells.area[i]);
        let volume = DVector::from_fn(n, |i, _| {
            let stored = aquifer.water_volume(i, eta[i]);
            stored - dt * source[i] + drainage(aquifer, i, stored, dt)
        });
        let total_volume = volume.sum();

        Self {
            thickness,
            source,
            volume,
            total_volume,
        }
    }
}

/// Outcome of comparing a step's total volume with the initial one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeCheck {
    /// `volume_new - volume_old` (m^3).
    pub difference: f64,
    /// Whether the difference exceeds the threshold.
    pub violated: bool,
}

/// Total water volume at the start of the run and the tolerance on its drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeLedger {
    initial: f64,
    threshold: f64,
}

impl VolumeLedger {
    /// Record the volume stored under the initial head `eta`.
    pub fn new(aquifer: &Aquifer, eta: &DVector<f64>, threshold: f64) -> Self {
        let initial = (0..aquifer.num_cells())
            .map(|i| aquifer.water_volume(i, eta[i]))
            .sum();
        Self { initial, threshold }
    }

    /// Initial total volume (m^3).
    pub fn initial(&self) -> f64 {
        self.initial
    }

    /// Allowed absolute drift (m^3).
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare `total` against the initial volume.
    pub fn check(&self, total: f64) -> VolumeCheck {
        let difference = total - self.initial;
        VolumeCheck {
            difference,
            violated: difference.abs() > self.threshold,
        }
    }
}
