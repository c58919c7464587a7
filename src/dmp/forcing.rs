// src/dmp/forcing.rs - Forcing terms that drive the transformation system
use ndarray::Array2;

use crate::config::ForcingScaling;
use crate::dmp::basis::BasisFunctionSet;
use crate::dmp::demo::forward_difference;
use crate::dmp::trajectory::OutputTrajectory;
use crate::dmp::transformation::TransformationSystem;

/// Activation sums below this give no forcing.
pub const MIN_ACTIVATION_SUM: f64 = 1e-10;

/// Boundary spans below this are treated as degenerate and scaled by 1.
pub const SPAN_EPSILON: f64 = 1e-9;

/// Source of the per-DOF forcing term at a given phase.
pub trait ForcingTerm {
    /// `rate` is the phase-stopping factor applied on the last canonical step.
    fn forcing(&self, phase: f64, rate: f64) -> Vec<f64>;
}

/// Per-DOF span factor used by the regressor during training.
pub fn training_scale(scaling: ForcingScaling, start: &[f64], goal: &[f64]) -> Vec<f64> {
    span_scale(scaling, start, goal, start, goal)
}

/// Per-DOF span factor for generation between `start` and `goal`.
///
/// DOFs that did not move in the demonstration were trained with span 1 and
/// keep it, so their learned shape is replayed in absolute units.
pub fn span_scale(
    scaling: ForcingScaling,
    trained_start: &[f64],
    trained_goal: &[f64],
    start: &[f64],
    goal: &[f64],
) -> Vec<f64> {
    (0..start.len())
        .map(|d| match scaling {
            ForcingScaling::Unscaled => 1.0,
            ForcingScaling::Original => {
                if (trained_goal[d] - trained_start[d]).abs() < SPAN_EPSILON {
                    1.0
                } else {
                    goal[d] - start[d]
                }
            }
        })
        .collect()
}

/// `f = (psi · w / sum(psi)) * x * scale`, the learned forcing term.
#[derive(Debug, Clone)]
pub struct LearnedForcing<'a> {
    basis: &'a BasisFunctionSet,
    weights: &'a Array2<f64>,
    scale: Vec<f64>,
}

impl<'a> LearnedForcing<'a> {
    pub fn new(basis: &'a BasisFunctionSet, weights: &'a Array2<f64>, scale: Vec<f64>) -> Self {
        Self {
            basis,
            weights,
            scale,
        }
    }
}

impl ForcingTerm for LearnedForcing<'_> {
    fn forcing(&self, phase: f64, _rate: f64) -> Vec<f64> {
        let psi = self.basis.activations(phase);
        let sum = psi.sum();
        if !(sum >= MIN_ACTIVATION_SUM) {
            tracing::trace!("activation sum {:e} at phase {:.6}; forcing suppressed", sum, phase);
            return vec![0.0; self.scale.len()];
        }
        self.weights
            .rows()
            .into_iter()
            .zip(&self.scale)
            .map(|(w, scale)| w.dot(&psi) / sum * phase * scale)
            .collect()
    }
}

/// Forcing that makes the transformation system follow a phase-indexed
/// reference, used to replay a learned motion backwards.
///
/// With the reference `z(x)` and its time derivatives, the forcing
/// `K (z - g) + D tau r ż + tau² r² z̈` turns the spring toward `g` into a
/// tracker of `z`, where `r` is the phase-stopping rate factor.
#[derive(Debug, Clone)]
pub struct ReferenceForcing {
    phases: Vec<f64>,
    positions: Vec<Vec<f64>>,
    velocities: Vec<Vec<f64>>,
    accelerations: Vec<Vec<f64>>,
    goal: Vec<f64>,
    system: TransformationSystem,
    tau: f64,
}

impl ReferenceForcing {
    /// Build the reverse reference from a completed forward rollout sampled
    /// every `dt`; the rollout is traversed from its last sample to its first.
    pub fn from_rollout(
        rollout: &OutputTrajectory,
        goal: Vec<f64>,
        system: TransformationSystem,
        tau: f64,
        dt: f64,
    ) -> Self {
        let points: Vec<_> = rollout.points().iter().rev().collect();
        let phases = points.iter().map(|p| p.phase).collect();
        let positions: Vec<Vec<f64>> = points.iter().map(|p| p.position.clone()).collect();
        let velocities = forward_difference(&positions, dt);
        let accelerations = forward_difference(&velocities, dt);
        Self {
            phases,
            positions,
            velocities,
            accelerations,
            goal,
            system,
            tau,
        }
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    fn interpolate(series: &[Vec<f64>], lower: usize, upper: usize, alpha: f64) -> Vec<f64> {
        series[lower]
            .iter()
            .zip(&series[upper])
            .map(|(a, b)| a + alpha * (b - a))
            .collect()
    }

    /// Reference position, velocity and acceleration at `phase`.
    pub fn lookup(&self, phase: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let last = self.phases.len() - 1;
        let upper = self.phases.partition_point(|&p| p <= phase);
        let (lower, upper, alpha) = if upper == 0 {
            (0, 0, 0.0)
        } else if upper > last {
            (last, last, 0.0)
        } else {
            let (p0, p1) = (self.phases[upper - 1], self.phases[upper]);
            (upper - 1, upper, (phase - p0) / (p1 - p0))
        };
        (
            Self::interpolate(&self.positions, lower, upper, alpha),
            Self::interpolate(&self.velocities, lower, upper, alpha),
            Self::interpolate(&self.accelerations, lower, upper, alpha),
        )
    }
}

impl ForcingTerm for ReferenceForcing {
    fn forcing(&self, phase: f64, rate: f64) -> Vec<f64> {
        let (z, dz, ddz) = self.lookup(phase);
        let k = self.system.stiffness();
        let d = self.system.damping();
        (0..self.goal.len())
            .map(|i| {
                k * (z[i] - self.goal[i])
                    + d * self.tau * rate * dz[i]
                    + self.tau * self.tau * rate * rate * ddz[i]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmp::trajectory::TrajectoryPoint;

    #[test]
    fn test_span_scale_guards_degenerate_dof() {
        let scale = span_scale(
            ForcingScaling::Original,
            &[0.0, 0.0],
            &[1.0, 0.0],
            &[2.0, 0.0],
            &[-1.0, 3.0],
        );
        assert_eq!(scale, vec![-3.0, 1.0]);
        let unscaled = span_scale(ForcingScaling::Unscaled, &[0.0], &[1.0], &[0.0], &[5.0]);
        assert_eq!(unscaled, vec![1.0]);
    }

    #[test]
    fn test_constant_weights_reproduce_constant_forcing() {
        let basis = BasisFunctionSet::new(30, -3.0, 1.0);
        let weights = Array2::from_elem((2, 30), 4.0);
        let forcing = LearnedForcing::new(&basis, &weights, vec![1.0, -0.5]);
        for phase in [1.0, 0.6, 0.2, 0.06] {
            let f = forcing.forcing(phase, 1.0);
            assert!((f[0] - 4.0 * phase).abs() < 1e-9);
            assert!((f[1] + 2.0 * phase).abs() < 1e-9);
        }
    }

    #[test]
    fn test_forcing_vanishes_far_outside_domain() {
        let basis = BasisFunctionSet::new(1000, -3.0, 1.0);
        let weights = Array2::from_elem((1, 1000), 1e6);
        let forcing = LearnedForcing::new(&basis, &weights, vec![1.0]);
        assert_eq!(forcing.forcing(-5.0, 1.0), vec![0.0]);
    }

    fn rollout(values: &[f64]) -> OutputTrajectory {
        let mut traj = OutputTrajectory::with_capacity(1, values.len());
        for (k, v) in values.iter().enumerate() {
            traj.push(TrajectoryPoint {
                time: k as f64 * 0.1,
                phase: (-0.3 * k as f64).exp(),
                position: vec![*v],
                velocity: vec![0.0],
                acceleration: vec![0.0],
            });
        }
        traj
    }

    #[test]
    fn test_reference_is_reversed_and_interpolated() {
        let reference = ReferenceForcing::from_rollout(
            &rollout(&[0.0, 1.0, 4.0, 9.0]),
            vec![0.0],
            TransformationSystem::new(100.0, 20.0),
            1.0,
            0.1,
        );
        assert_eq!(reference.len(), 4);
        let first_phase = (-0.9f64).exp();
        let (z, dz, _) = reference.lookup(first_phase);
        assert!((z[0] - 9.0).abs() < 1e-12);
        assert!((dz[0] + 50.0).abs() < 1e-9);
        let (z, _, _) = reference.lookup(1.0);
        assert!(z[0].abs() < 1e-12);
        let mid = 0.5 * ((-0.3f64).exp() + 1.0);
        let (z, _, _) = reference.lookup(mid);
        assert!((z[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_reference_forcing_at_rest_holds_position() {
        let reference = ReferenceForcing::from_rollout(
            &rollout(&[2.0, 2.0, 2.0]),
            vec![0.0],
            TransformationSystem::new(100.0, 20.0),
            1.0,
            0.1,
        );
        let f = reference.forcing(0.8, 1.0);
        let system = TransformationSystem::new(100.0, 20.0);
        let acc = system.acceleration(2.0, 0.0, 0.0, f[0], 0.0, 1.0);
        assert!(acc.abs() < 1e-9);
    }
}
