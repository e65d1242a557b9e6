//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryRegime;
use crate::cg::CgConfig;
use crate::error::{Error, Result};
use crate::newton::NewtonConfig;
use crate::transmissivity::{InterfaceThickness, TransmissivityUpdate};

/// Parameters of a transient run.
///
/// Every field has a default, so a partial document deserializes into a
/// complete configuration:
///
/// ```
/// use boussinesq_solver::SimulationConfig;
///
/// let config: SimulationConfig = serde_json::from_str(r#"{ "dt": 600.0 }"#).unwrap();
/// assert_eq!(config.dt, 600.0);
/// assert_eq!(config.horizon, 86_400.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Time step (s).
    pub dt: f64,
    /// End of the simulated interval (s).
    pub horizon: f64,
    /// Boundary-condition regime.
    pub regime: BoundaryRegime,
    /// Newton convergence criteria.
    pub newton: NewtonConfig,
    /// Linear solver settings.
    pub cg: CgConfig,
    /// Interface thickness rule.
    pub thickness: InterfaceThickness,
    /// When the transmissivity is re-evaluated.
    pub update: TransmissivityUpdate,
    /// Absolute drift of the total volume tolerated before warning (m^3).
    pub conservation_threshold: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 3600.0,
            horizon: 86_400.0,
            regime: BoundaryRegime::default(),
            newton: NewtonConfig::default(),
            cg: CgConfig::default(),
            thickness: InterfaceThickness::default(),
            update: TransmissivityUpdate::default(),
            conservation_threshold: 1e-6,
        }
    }
}

impl SimulationConfig {
    /// Set the time step.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the horizon.
    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the boundary regime.
    pub fn with_regime(mut self, regime: BoundaryRegime) -> Self {
        self.regime = regime;
        self
    }

    /// Set the Newton criteria.
    pub fn with_newton(mut self, newton: NewtonConfig) -> Self {
        self.newton = newton;
        self
    }

    /// Set the CG settings.
    pub fn with_cg(mut self, cg: CgConfig) -> Self {
        self.cg = cg;
        self
    }

    /// Set the interface thickness rule.
    pub fn with_thickness(mut self, thickness: InterfaceThickness) -> Self {
        self.thickness = thickness;
        self
    }

    /// Set the transmissivity update mode.
    pub fn with_update(mut self, update: TransmissivityUpdate) -> Self {
        self.update = update;
        self
    }

    /// Set the conservation threshold.
    pub fn with_conservation_threshold(mut self, threshold: f64) -> Self {
        self.conservation_threshold = threshold;
        self
    }

    /// Number of steps covering the horizon, `ceil(horizon / dt)`.
    pub fn num_steps(&self) -> usize {
        (self.horizon / self.dt).ceil() as usize
    }

    /// Reject values the solver cannot run with.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )))
            }
        }

        positive("dt", self.dt)?;
        positive("horizon", self.horizon)?;
        positive("newton.machine_epsilon", self.newton.machine_epsilon)?;
        positive(
            "newton.dirichlet_tolerance_scale",
            self.newton.dirichlet_tolerance_scale,
        )?;
        positive(
            "newton.no_dirichlet_tolerance_scale",
            self.newton.no_dirichlet_tolerance_scale,
        )?;

        if self.newton.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "newton.max_iterations must be at least 1".into(),
            ));
        }
        if self.cg.max_iter == 0 {
            return Err(Error::InvalidConfig(
                "cg.max_iter must be at least 1".into(),
            ));
        }
        if !(self.cg.tol >= 0.0) || !(self.cg.abs_tol >= 0.0) {
            return Err(Error::InvalidConfig(
                "cg tolerances must be non-negative".into(),
            ));
        }
        if !(self.conservation_threshold >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "conservation_threshold must be non-negative, got {}",
                self.conservation_threshold
            )));
        }
        Ok(())
    }
}
