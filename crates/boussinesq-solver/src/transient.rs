//! Fixed-step time integration with a running mass balance.
//!
//! A [`Simulation`] owns the domain, the head and the configuration for the
//! whole run. Each call to [`Simulation::step`] imposes prescribed heads,
//! solves the step with Newton, derives the cell outputs and checks the total
//! volume against the volume stored at the start of the run. A drift beyond
//! the threshold is reported, never fatal.

use boussinesq_core::Aquifer;
use nalgebra::DVector;

use crate::boundary::{BoundaryRegime, BoundaryStrategy, StepContext};
use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use crate::newton::{NewtonMetrics, solve_newton};
use crate::output::{OutputWriter, StepReport};
use crate::volume::{CellOutputs, VolumeLedger};

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Head after the last step (m).
    pub head: DVector<f64>,
    /// Steps taken.
    pub steps: usize,
    /// Simulated time reached (s).
    pub time: f64,
    /// Newton work summed over all steps.
    pub metrics: NewtonMetrics,
    /// Steps whose total volume drifted beyond the threshold.
    pub conservation_violations: usize,
    /// Total volume before the first step (m^3).
    pub initial_volume: f64,
    /// Total volume after the last step (m^3).
    pub final_volume: f64,
}

/// A transient run in progress.
pub struct Simulation {
    aquifer: Aquifer,
    config: SimulationConfig,
    strategy: Box<dyn BoundaryStrategy>,
    eta: DVector<f64>,
    ledger: VolumeLedger,
    step: usize,
    time: f64,
    metrics: NewtonMetrics,
    conservation_violations: usize,
    last_volume: f64,
}

impl Simulation {
    /// Set up a run from the initial head `eta`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if the configuration does not validate, or
    ///   the no-Dirichlet regime is chosen while cells are prescribed.
    /// - [`Error::DimensionMismatch`] if `eta` does not cover every cell.
    pub fn new(aquifer: Aquifer, eta: DVector<f64>, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        if eta.len() != aquifer.num_cells() {
            return Err(Error::DimensionMismatch {
                expected: aquifer.num_cells(),
                actual: eta.len(),
            });
        }
        if config.regime == BoundaryRegime::NoDirichlet && aquifer.cells().has_prescribed() {
            return Err(Error::InvalidConfig(
                "no-Dirichlet regime requested but some cells have a prescribed head".into(),
            ));
        }

        let ledger = VolumeLedger::new(&aquifer, &eta, config.conservation_threshold);
        let strategy = config.regime.strategy();

        log::info!(
            "{} cells, {} regime, {} steps of {} s, initial volume {:.6e} m^3",
            aquifer.num_cells(),
            config.regime,
            config.num_steps(),
            config.dt,
            ledger.initial()
        );

        Ok(Self {
            aquifer,
            config,
            strategy,
            eta,
            last_volume: ledger.initial(),
            ledger,
            step: 0,
            time: 0.0,
            metrics: NewtonMetrics::default(),
            conservation_violations: 0,
        })
    }

    /// Domain of the run.
    pub fn aquifer(&self) -> &Aquifer {
        &self.aquifer
    }

    /// Configuration of the run.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current head (m).
    pub fn head(&self) -> &DVector<f64> {
        &self.eta
    }

    /// Steps taken so far.
    pub fn steps_taken(&self) -> usize {
        self.step
    }

    /// Simulated time reached (s).
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Total volume before the first step (m^3).
    pub fn initial_volume(&self) -> f64 {
        self.ledger.initial()
    }

    /// Whether the horizon has been covered.
    pub fn is_finished(&self) -> bool {
        self.step >= self.config.num_steps()
    }

    /// Advance by one time step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimeStep`] wrapping the Newton or linear-solver
    /// failure. The head is restored to its value at the start of the step,
    /// prescribed heads included.
    pub fn step(&mut self) -> Result<StepReport> {
        let step = self.step + 1;
        let dt = self.config.dt;
        let time = step as f64 * dt;

        self.strategy.impose_heads(&self.aquifer, &mut self.eta);
        let eta_prev = self.eta.clone();
        let ctx = StepContext::new(
            &self.aquifer,
            &eta_prev,
            dt,
            self.config.thickness,
            self.config.update,
        );

        let metrics = match solve_newton(
            self.strategy.as_ref(),
            &ctx,
            &mut self.eta,
            &self.config.newton,
            &self.config.cg,
        ) {
            Ok(metrics) => metrics,
            Err(e) => {
                self.eta.copy_from(&eta_prev);
                return Err(Error::TimeStep {
                    step,
                    time,
                    source: Box::new(e),
                });
            }
        };

        let outputs = CellOutputs::compute(&self.aquifer, &self.eta, dt);
        let check = self.ledger.check(outputs.total_volume);
        if check.violated {
            self.conservation_violations += 1;
            log::warn!(
                "step {}: total volume {:.9e} m^3 differs from initial {:.9e} m^3 by {:.3e}",
                step,
                outputs.total_volume,
                self.ledger.initial(),
                check.difference
            );
        }

        log::info!(
            "step {} t={} s: {} Newton iterations, {} CG iterations, volume {:.6e} m^3",
            step,
            time,
            metrics.iterations,
            metrics.cg_iterations,
            outputs.total_volume
        );

        self.step = step;
        self.time = time;
        self.metrics.accumulate(&metrics);
        self.last_volume = outputs.total_volume;

        Ok(StepReport {
            step,
            time,
            head: self.eta.clone(),
            thickness: outputs.thickness,
            volume: outputs.volume,
            source: outputs.source,
            metrics,
            initial_volume: self.ledger.initial(),
            total_volume: outputs.total_volume,
            conservation_violated: check.violated,
        })
    }

    /// Step until the horizon, handing every report to `writer`.
    pub fn run(&mut self, writer: &mut dyn OutputWriter) -> Result<SimulationResult> {
        while !self.is_finished() {
            let report = self.step()?;
            writer.write_step(&report)?;
        }
        writer.finish()?;
        Ok(self.result())
    }

    /// Summary of the steps taken so far.
    pub fn result(&self) -> SimulationResult {
        SimulationResult {
            head: self.eta.clone(),
            steps: self.step,
            time: self.time,
            metrics: self.metrics,
            conservation_violations: self.conservation_violations,
            initial_volume: self.ledger.initial(),
            final_volume: self.last_volume,
        }
    }
}

/// Run a full simulation from the initial head `eta`.
pub fn solve_transient(
    aquifer: Aquifer,
    eta: DVector<f64>,
    config: SimulationConfig,
    writer: &mut dyn OutputWriter,
) -> Result<SimulationResult> {
    Simulation::new(aquifer, eta, config)?.run(writer)
}
