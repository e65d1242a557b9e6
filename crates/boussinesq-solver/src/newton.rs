//! Newton iteration for one time step.

use std::time::{Duration, Instant};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::assembly::{compute_jacobian, compute_residual};
use crate::boundary::{BoundaryRegime, BoundaryStrategy, StepContext};
use crate::cg::{CgConfig, solve_cg};
use crate::error::{Error, Result};
use crate::operator::CsrOperator;

/// Convergence criteria for the Newton iteration.
///
/// The iteration stops once the largest head correction is at most
/// `tolerance_scale * machine_epsilon`, with the scale chosen by regime.
///
/// The tolerance is absolute, in metres. Corrections cannot fall below the
/// rounding error of the head itself, roughly `max|eta| * machine_epsilon`,
/// so the defaults suit heads of up to a few hundred metres. For heads
/// measured against a distant datum (e.g. bedrock at 1000 m) grow both scales
/// with the head magnitude, otherwise runs stall at the iteration cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    /// Maximum iterations before failure.
    pub max_iterations: usize,
    /// Unit roundoff the tolerance is expressed in.
    pub machine_epsilon: f64,
    /// Tolerance multiplier with prescribed heads.
    pub dirichlet_tolerance_scale: f64,
    /// Tolerance multiplier without prescribed heads.
    pub no_dirichlet_tolerance_scale: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            machine_epsilon: f64::EPSILON,
            dirichlet_tolerance_scale: 100.0,
            no_dirichlet_tolerance_scale: 1000.0,
        }
    }
}

impl NewtonConfig {
    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the machine epsilon.
    pub fn with_machine_epsilon(mut self, machine_epsilon: f64) -> Self {
        self.machine_epsilon = machine_epsilon;
        self
    }

    /// Set the tolerance scale of both regimes.
    pub fn with_tolerance_scales(mut self, dirichlet: f64, no_dirichlet: f64) -> Self {
        self.dirichlet_tolerance_scale = dirichlet;
        self.no_dirichlet_tolerance_scale = no_dirichlet;
        self
    }

    /// Largest head correction accepted as converged (m).
    pub fn tolerance(&self, regime: BoundaryRegime) -> f64 {
        let scale = match regime {
            BoundaryRegime::Dirichlet => self.dirichlet_tolerance_scale,
            BoundaryRegime::NoDirichlet => self.no_dirichlet_tolerance_scale,
        };
        scale * self.machine_epsilon
    }
}

/// Work done by one Newton solve.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NewtonMetrics {
    /// Newton iterations performed.
    pub iterations: usize,
    /// CG iterations summed over all Newton iterations.
    pub cg_iterations: usize,
    /// Largest head correction of the last iteration (m).
    pub max_correction: f64,
    /// Time spent assembling residual and Jacobian.
    pub assembly_time: Duration,
    /// Time spent in the linear solver.
    pub solve_time: Duration,
}

impl NewtonMetrics {
    /// Add the work of another solve to this one.
    pub fn accumulate(&mut self, other: &NewtonMetrics) {
        self.iterations += other.iterations;
        self.cg_iterations += other.cg_iterations;
        self.max_correction = other.max_correction;
        self.assembly_time += other.assembly_time;
        self.solve_time += other.solve_time;
    }
}

/// Drive `eta` to the solution of the step described by `ctx`.
///
/// `eta` holds the initial guess on entry and the converged head on success.
/// At least one iteration is always performed.
///
/// # Errors
///
/// - [`Error::LinearSolve`] if CG fails, tagged with the Newton iteration.
/// - [`Error::NewtonDiverged`] if the iteration cap is reached.
pub fn solve_newton(
    strategy: &dyn BoundaryStrategy,
    ctx: &StepContext<'_>,
    eta: &mut DVector<f64>,
    config: &NewtonConfig,
    cg: &CgConfig,
) -> Result<NewtonMetrics> {
    let aquifer = ctx.aquifer;
    if eta.len() != aquifer.num_cells() {
        return Err(Error::DimensionMismatch {
            expected: aquifer.num_cells(),
            actual: eta.len(),
        });
    }

    let tolerance = config.tolerance(strategy.regime());
    let mut metrics = NewtonMetrics::default();

    loop {
        let iteration = metrics.iterations + 1;

        let start = Instant::now();
        let system = strategy.assemble_system(ctx, eta);
        let residual = compute_residual(aquifer, &system, eta, ctx.dt);
        let jacobian = compute_jacobian(aquifer, &system, eta, ctx.dt);
        metrics.assembly_time += start.elapsed();

        let start = Instant::now();
        let op = CsrOperator::new(aquifer.mesh(), &jacobian);
        let correction = solve_cg(&op, &residual, cg).map_err(|e| Error::LinearSolve {
            iteration,
            source: Box::new(e),
        })?;
        metrics.solve_time += start.elapsed();

        *eta -= &correction.x;

        metrics.iterations = iteration;
        metrics.cg_iterations += correction.iterations;
        metrics.max_correction = correction.max_abs();

        log::debug!(
            "Newton iteration {}: max correction {:.3e} (cell {}), {} CG iterations",
            iteration,
            metrics.max_correction,
            if correction.max.value.abs() >= correction.min.value.abs() {
                correction.max.index
            } else {
                correction.min.index
            },
            correction.iterations
        );

        if metrics.max_correction <= tolerance {
            return Ok(metrics);
        }
        if iteration >= config.max_iterations {
            return Err(Error::NewtonDiverged {
                iterations: iteration,
                max_correction: metrics.max_correction,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::LinearSystem;
    use crate::boundary::{DirichletStrategy, NoDirichletStrategy};
    use crate::transmissivity::{InterfaceThickness, TransmissivityUpdate};
    use boussinesq_core::{Aquifer, Boundary, CellProperties, Edge, Mesh};
    use nalgebra::dvector;

    fn line(n: usize, prescribed: Option<f64>) -> Aquifer {
        let edges: Vec<Edge> = (0..n - 1)
            .map(|i| Edge::new(i, i + 1, 1.0, 1.0, 1e-4))
            .collect();
        let mesh = Mesh::from_edges(n, &edges).unwrap();
        let mut cells = CellProperties::uniform(n, 0.0, 0.4, 1.0);
        if let Some(head) = prescribed {
            cells = cells.with_boundary(0, Boundary::Prescribed(head));
        }
        Aquifer::new(mesh, cells).unwrap()
    }

    fn context<'a>(
        aq: &'a Aquifer,
        prev: &'a DVector<f64>,
        update: TransmissivityUpdate,
    ) -> StepContext<'a> {
        StepContext::new(aq, prev, 3600.0, InterfaceThickness::Upwind, update)
    }

    #[test]
    fn test_tolerance_per_regime() {
        let config = NewtonConfig::default();
        assert_eq!(
            config.tolerance(BoundaryRegime::Dirichlet),
            100.0 * f64::EPSILON
        );
        assert_eq!(
            config.tolerance(BoundaryRegime::NoDirichlet),
            1000.0 * f64::EPSILON
        );
    }

    #[test]
    fn test_newton_converges_to_zero_residual() {
        for update in [
            TransmissivityUpdate::EveryIteration,
            TransmissivityUpdate::StartOfStep,
        ] {
            let aq = line(5, Some(1.0));
            let mut eta = dvector![1.0, 0.5, 0.5, 0.5, 0.5];
            let prev = eta.clone();
            let ctx = context(&aq, &prev, update);

            let metrics = solve_newton(
                &DirichletStrategy,
                &ctx,
                &mut eta,
                &NewtonConfig::default(),
                &CgConfig::default(),
            )
            .unwrap();

            assert!(metrics.iterations >= 1);
            assert!(metrics.cg_iterations >= metrics.iterations);
            assert!(metrics.max_correction <= 100.0 * f64::EPSILON);

            let system: LinearSystem = DirichletStrategy.assemble_system(&ctx, &eta);
            let r = compute_residual(&aq, &system, &eta, 3600.0);
            assert!(r.amax() < 1e-12, "{:?}: residual {}", update, r);
        }
    }

    #[test]
    fn test_high_elevation_needs_larger_scales() {
        let n = 20;
        let edges: Vec<Edge> = (0..n - 1)
            .map(|i| Edge::new(i, i + 1, 1.0, 1.0, 1e-4))
            .collect();
        let mesh = Mesh::from_edges(n, &edges).unwrap();
        let cells = CellProperties::uniform(n, 1000.0, 0.4, 1.0)
            .with_boundary(0, Boundary::Prescribed(1001.0));
        let aq = Aquifer::new(mesh, cells).unwrap();

        let mut eta = DVector::from_element(n, 1000.5);
        DirichletStrategy.impose_heads(&aq, &mut eta);
        let prev = eta.clone();
        let ctx = context(&aq, &prev, TransmissivityUpdate::EveryIteration);

        // Scales sized for heads around 1000 m.
        let config = NewtonConfig::default().with_tolerance_scales(1e4, 1e5);
        let metrics = solve_newton(
            &DirichletStrategy,
            &ctx,
            &mut eta,
            &config,
            &CgConfig::default(),
        )
        .unwrap();

        assert!(metrics.max_correction <= 1e4 * f64::EPSILON);
        assert_eq!(eta[0], 1001.0);
        assert!(eta[1] > 1000.5);
        assert!(eta.iter().skip(1).all(|&v| v >= 1000.5 && v < 1001.0));
    }

    #[test]
    fn test_newton_at_rest_single_iteration() {
        let aq = line(3, None);
        let mut eta = dvector![1.0, 1.0, 1.0];
        let prev = eta.clone();
        let ctx = context(&aq, &prev, TransmissivityUpdate::EveryIteration);

        let metrics = solve_newton(
            &NoDirichletStrategy,
            &ctx,
            &mut eta,
            &NewtonConfig::default(),
            &CgConfig::default(),
        )
        .unwrap();

        assert_eq!(metrics.iterations, 1);
        assert!(eta.iter().all(|&v| (v - 1.0).abs() < 1e-14));
    }

    #[test]
    fn test_newton_iteration_cap() {
        let aq = line(5, Some(1.0));
        let mut eta = dvector![1.0, 0.5, 0.5, 0.5, 0.5];
        let prev = eta.clone();
        let ctx = context(&aq, &prev, TransmissivityUpdate::EveryIteration);
        let config = NewtonConfig::default().with_max_iterations(1);

        let result = solve_newton(
            &DirichletStrategy,
            &ctx,
            &mut eta,
            &config,
            &CgConfig::default(),
        );
        assert!(matches!(
            result,
            Err(Error::NewtonDiverged { iterations: 1, .. })
        ));
    }

    #[test]
    fn test_linear_solve_failure_is_tagged() {
        let aq = line(5, Some(1.0));
        let mut eta = dvector![1.0, 0.5, 0.5, 0.5, 0.5];
        let prev = eta.clone();
        let ctx = context(&aq, &prev, TransmissivityUpdate::EveryIteration);
        let cg = CgConfig::default().with_max_iter(1);

        let result = solve_newton(
            &DirichletStrategy,
            &ctx,
            &mut eta,
            &NewtonConfig::default(),
            &cg,
        );
        match result {
            Err(Error::LinearSolve { iteration, source }) => {
                assert_eq!(iteration, 1);
                assert!(matches!(*source, Error::ConvergenceFailed { .. }));
            }
            other => panic!("expected linear solve failure, got {:?}", other),
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let aq = line(3, None);
        let prev = dvector![1.0, 1.0, 1.0];
        let ctx = context(&aq, &prev, TransmissivityUpdate::EveryIteration);
        let mut eta = dvector![1.0, 1.0];

        let result = solve_newton(
            &NoDirichletStrategy,
            &ctx,
            &mut eta,
            &NewtonConfig::default(),
            &CgConfig::default(),
        );
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_metrics_accumulate() {
        let mut total = NewtonMetrics::default();
        let step = NewtonMetrics {
            iterations: 3,
            cg_iterations: 12,
            max_correction: 1e-15,
            assembly_time: Duration::from_millis(2),
            solve_time: Duration::from_millis(5),
        };
        total.accumulate(&step);
        total.accumulate(&step);
        assert_eq!(total.iterations, 6);
        assert_eq!(total.cg_iterations, 24);
        assert_eq!(total.solve_time, Duration::from_millis(10));
    }
}
