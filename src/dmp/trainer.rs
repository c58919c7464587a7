// src/dmp/trainer.rs - Locally weighted regression of the basis weights
use ndarray::{Array2, Zip};

use crate::config::{DmpConfig, ForcingScaling};
use crate::dmp::basis::BasisFunctionSet;
use crate::dmp::canonical::CanonicalSystem;
use crate::dmp::demo::DemoTrajectory;
use crate::dmp::error::DmpError;
use crate::dmp::forcing::{training_scale, MIN_ACTIVATION_SUM};
use crate::dmp::transformation::TransformationSystem;

/// Samples whose phase falls below this are skipped.
const MIN_PHASE: f64 = 1e-12;

/// Basis functions whose regression denominator falls below this get weight 0.
const MIN_DENOMINATOR: f64 = 1e-12;

/// Weights fitted to one demonstration.
#[derive(Debug, Clone)]
pub struct Fit {
    /// `dof x rbf_num`
    pub weights: Array2<f64>,
    /// Samples dropped because their phase or activation sum was too small.
    pub skipped_samples: usize,
    /// Basis functions that no sample activated.
    pub unresolved_basis: usize,
}

/// Fits the forcing term of each DOF to the demonstration in a single pass.
#[derive(Debug, Clone)]
pub struct Trainer {
    system: TransformationSystem,
    scaling: ForcingScaling,
    ax: f64,
    tau: f64,
    dt: f64,
    steps: usize,
}

impl Trainer {
    pub fn from_config(config: &DmpConfig) -> Self {
        Self {
            system: TransformationSystem::from_config(config),
            scaling: config.scaling,
            ax: config.ax,
            tau: config.tau,
            dt: config.dt,
            steps: config.horizon_steps(config.tau, config.dt),
        }
    }

    /// Regress `w_i = sum_k psi_i(x_k) s_k f_k / sum_k psi_i(x_k) s_k^2` with
    /// `s_k = x_k * span` and `f_k` the forcing that reproduces sample `k`.
    pub fn fit(&self, demo: &DemoTrajectory, basis: &BasisFunctionSet) -> Result<Fit, DmpError> {
        let dof = demo.dof();
        let rbf_num = basis.len();
        let kinematics = demo.kinematics(self.steps, self.dt);
        let phases = CanonicalSystem::nominal_phases(self.ax, self.steps, self.dt, self.tau);
        let goal = demo.goal();
        let span = training_scale(self.scaling, demo.start(), goal);

        // span is folded out of the regressor so the guards below are scale free
        let mut numerator = Array2::<f64>::zeros((dof, rbf_num));
        let mut denominator = Array2::<f64>::zeros((dof, rbf_num));
        let mut skipped_samples = 0;

        for (k, &phase) in phases.iter().enumerate() {
            let psi = basis.activations(phase);
            let sum = psi.sum();
            if phase < MIN_PHASE || !(sum >= MIN_ACTIVATION_SUM) {
                skipped_samples += 1;
                continue;
            }
            for d in 0..dof {
                let target = self.system.forcing_target(
                    kinematics.positions[k][d],
                    kinematics.velocities[k][d],
                    kinematics.accelerations[k][d],
                    goal[d],
                    self.tau,
                );
                numerator.row_mut(d).scaled_add(phase * target, &psi);
                denominator.row_mut(d).scaled_add(phase * phase, &psi);
            }
        }

        if skipped_samples == phases.len() {
            return Err(DmpError::NumericInstability(format!(
                "all {} training samples had vanishing basis activation",
                phases.len()
            )));
        }

        let mut weights = Array2::<f64>::zeros((dof, rbf_num));
        Zip::from(&mut weights)
            .and(&numerator)
            .and(&denominator)
            .for_each(|w, &num, &den| {
                if den > MIN_DENOMINATOR {
                    *w = num / den;
                }
            });
        for (mut row, scale) in weights.rows_mut().into_iter().zip(&span) {
            row /= *scale;
        }

        let unresolved_basis = denominator
            .row(0)
            .iter()
            .filter(|den| !(**den > MIN_DENOMINATOR))
            .count();
        if unresolved_basis == rbf_num {
            return Err(DmpError::NumericInstability(
                "no basis function was activated by the demonstration".to_string(),
            ));
        }
        if skipped_samples > 0 || unresolved_basis > 0 {
            tracing::warn!(
                "Training skipped {} samples, {} basis functions left at zero",
                skipped_samples,
                unresolved_basis
            );
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(DmpError::NumericInstability("non-finite weight after regression".to_string()));
        }

        tracing::debug!(
            "Fitted {}x{} weights on {} samples",
            dof,
            rbf_num,
            phases.len() - skipped_samples
        );
        Ok(Fit {
            weights,
            skipped_samples,
            unresolved_basis,
        })
    }
}
