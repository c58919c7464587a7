// src/dmp/generator.rs - Shared forward/reverse integration loop
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dmp::canonical::{CanonicalSystem, Direction};
use crate::dmp::error::DmpError;
use crate::dmp::forcing::ForcingTerm;
use crate::dmp::trajectory::{OutputTrajectory, TrajectoryPoint};
use crate::dmp::transformation::{TransformationState, TransformationSystem};

/// Runs are cut off after this many nominal horizons.
pub const MAX_HORIZON_MULTIPLE: usize = 10;

/// Upper bound on samples reserved up front; longer runs grow the buffer.
const PREALLOCATED_SAMPLES: usize = 1 << 16;

/// Fully resolved parameters of one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub direction: Direction,
    pub start: Vec<f64>,
    pub goal: Vec<f64>,
    /// Initial velocity.
    pub dy: Vec<f64>,
    pub tau: f64,
    pub dt: f64,
    /// Phase-stopping gain.
    pub ac: f64,
    /// External force on the actual state; all zeros when coupling is suppressed.
    pub ext_force: Vec<f64>,
    pub goal_thresh: Option<f64>,
    pub horizon_steps: usize,
    pub step_cap: usize,
}

impl RunPlan {
    pub fn dof(&self) -> usize {
        self.start.len()
    }

    /// Undisturbed forward run between the same boundaries with start and
    /// goal swapped. Its reversal is the reference a reverse run tracks.
    pub fn mirrored_nominal(&self) -> RunPlan {
        let dof = self.dof();
        RunPlan {
            direction: Direction::Forward,
            start: self.goal.clone(),
            goal: self.start.clone(),
            dy: vec![0.0; dof],
            tau: self.tau,
            dt: self.dt,
            ac: 0.0,
            ext_force: vec![0.0; dof],
            goal_thresh: None,
            horizon_steps: self.horizon_steps,
            step_cap: self.step_cap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Phase reached its boundary.
    Completed,
    /// Actual position came within `goal_thresh` of the goal.
    GoalReached,
    /// Step cap hit before the phase finished.
    Truncated,
    /// Cancellation flag raised by the caller.
    Cancelled,
}

/// Output of one run plus how it ended.
#[derive(Debug, Clone)]
pub struct GeneratedTrajectory {
    pub trajectory: OutputTrajectory,
    pub termination: Termination,
    pub steps: usize,
    pub final_phase: f64,
}

impl GeneratedTrajectory {
    pub fn is_truncated(&self) -> bool {
        self.termination == Termination::Truncated
    }

    pub fn is_complete(&self) -> bool {
        matches!(
            self.termination,
            Termination::Completed | Termination::GoalReached
        )
    }

    /// Turns a truncated or cancelled run into an error.
    pub fn ensure_complete(self) -> Result<OutputTrajectory, DmpError> {
        match self.termination {
            Termination::Completed | Termination::GoalReached => Ok(self.trajectory),
            Termination::Truncated => Err(DmpError::GenerationTruncated {
                steps: self.steps,
                phase: self.final_phase,
            }),
            Termination::Cancelled => Err(DmpError::GenerationCancelled { steps: self.steps }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Generator {
    ax: f64,
    system: TransformationSystem,
}

impl Generator {
    pub fn new(ax: f64, system: TransformationSystem) -> Self {
        Self { ax, system }
    }

    pub fn run(
        &self,
        forcing: &dyn ForcingTerm,
        plan: &RunPlan,
        cancel: Option<&AtomicBool>,
    ) -> GeneratedTrajectory {
        let dof = plan.dof();
        let canonical = CanonicalSystem::for_horizon(
            self.ax,
            plan.direction,
            plan.horizon_steps,
            plan.dt,
            plan.tau,
        );
        let no_force = vec![0.0; dof];
        let mut phase_state = canonical.initial_state();
        let mut ideal = TransformationState::new(plan.start.clone(), plan.dy.clone());
        let mut actual = ideal.clone();
        let mut trajectory = OutputTrajectory::with_capacity(
            dof,
            plan.horizon_steps.saturating_add(1).min(PREALLOCATED_SAMPLES),
        );
        trajectory.push(sample(0.0, phase_state.phase, &actual));

        tracing::debug!(
            "Generating {:?}: {} nominal steps, tau {}, dt {}, ac {}",
            plan.direction,
            plan.horizon_steps,
            plan.tau,
            plan.dt,
            plan.ac
        );

        let mut steps = 0;
        let termination = loop {
            if canonical.is_finished(&phase_state) {
                break Termination::Completed;
            }
            if let Some(thresh) = plan.goal_thresh {
                if distance(&actual.position, &plan.goal) <= thresh {
                    break Termination::GoalReached;
                }
            }
            if steps >= plan.step_cap {
                break Termination::Truncated;
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break Termination::Cancelled;
            }

            let f = forcing.forcing(phase_state.phase, phase_state.rate);
            self.system
                .step(&mut ideal, &plan.goal, &f, &no_force, plan.tau, plan.dt);
            self.system
                .step(&mut actual, &plan.goal, &f, &plan.ext_force, plan.tau, plan.dt);
            let error = TransformationSystem::tracking_error(&ideal, &actual);
            phase_state = canonical.step(phase_state, plan.dt, plan.tau, plan.ac, error);
            steps += 1;
            trajectory.push(sample(steps as f64 * plan.dt, phase_state.phase, &actual));
        };

        match termination {
            Termination::Truncated => tracing::warn!(
                "Generation truncated after {} steps at phase {:.6} (boundary {:.6})",
                steps,
                phase_state.phase,
                canonical.boundary()
            ),
            _ => tracing::debug!("Generation ended {:?} after {} steps", termination, steps),
        }

        GeneratedTrajectory {
            trajectory,
            termination,
            steps,
            final_phase: phase_state.phase,
        }
    }
}

fn sample(time: f64, phase: f64, state: &TransformationState) -> TrajectoryPoint {
    TrajectoryPoint {
        time,
        phase,
        position: state.position.clone(),
        velocity: state.velocity.clone(),
        acceleration: state.acceleration.clone(),
    }
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoForcing(usize);

    impl ForcingTerm for NoForcing {
        fn forcing(&self, _phase: f64, _rate: f64) -> Vec<f64> {
            vec![0.0; self.0]
        }
    }

    fn plan(direction: Direction) -> RunPlan {
        RunPlan {
            direction,
            start: vec![0.0, 1.0],
            goal: vec![1.0, 1.0],
            dy: vec![0.0, 0.0],
            tau: 1.0,
            dt: 0.001,
            ac: 1.0,
            ext_force: vec![0.0, 0.0],
            goal_thresh: None,
            horizon_steps: 1000,
            step_cap: MAX_HORIZON_MULTIPLE * 1000,
        }
    }

    fn generator() -> Generator {
        Generator::new(-3.0, TransformationSystem::new(10_000.0, 200.0))
    }

    #[test]
    fn test_unforced_run_completes_on_horizon() {
        let out = generator().run(&NoForcing(2), &plan(Direction::Forward), None);
        assert_eq!(out.termination, Termination::Completed);
        assert_eq!(out.steps, 1000);
        assert_eq!(out.trajectory.len(), 1001);
        let first = out.trajectory.first().unwrap();
        assert_eq!(first.position, vec![0.0, 1.0]);
        assert_eq!(first.acceleration, vec![0.0, 0.0]);
        let last = out.trajectory.last().unwrap();
        assert!((last.time - 1.0).abs() < 1e-9);
        assert!((last.position[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reverse_phase_climbs_to_one() {
        let out = generator().run(&NoForcing(2), &plan(Direction::Reverse), None);
        assert_eq!(out.termination, Termination::Completed);
        let phases = out.trajectory.phases();
        assert!(phases.windows(2).all(|w| w[1] > w[0]));
        assert!((out.final_phase - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_goal_threshold_stops_early() {
        let mut p = plan(Direction::Forward);
        p.goal_thresh = Some(0.05);
        let out = generator().run(&NoForcing(2), &p, None);
        assert_eq!(out.termination, Termination::GoalReached);
        assert!(out.steps < 1000);
        let last = out.trajectory.last().unwrap();
        assert!(distance(&last.position, &p.goal) <= 0.05);
        assert!(out.ensure_complete().is_ok());
    }

    #[test]
    fn test_external_force_with_huge_gain_truncates() {
        let mut p = plan(Direction::Forward);
        p.ac = 1e6;
        p.ext_force = vec![1e4, 1e4];
        let out = generator().run(&NoForcing(2), &p, None);
        assert!(out.is_truncated());
        assert_eq!(out.steps, p.step_cap);
        assert_eq!(out.trajectory.len(), p.step_cap + 1);
        assert!(out.final_phase > (-3.0f64).exp());
        assert!(matches!(
            out.ensure_complete(),
            Err(DmpError::GenerationTruncated { steps: 10_000, .. })
        ));
    }

    #[test]
    fn test_raised_flag_cancels_before_first_step() {
        let flag = AtomicBool::new(true);
        let out = generator().run(&NoForcing(2), &plan(Direction::Forward), Some(&flag));
        assert_eq!(out.termination, Termination::Cancelled);
        assert_eq!(out.trajectory.len(), 1);
        assert_eq!(
            out.ensure_complete().unwrap_err(),
            DmpError::GenerationCancelled { steps: 0 }
        );
    }

    #[test]
    fn test_mirrored_nominal_swaps_boundaries() {
        let mut p = plan(Direction::Reverse);
        p.ext_force = vec![3.0, 3.0];
        p.goal_thresh = Some(0.1);
        let mirror = p.mirrored_nominal();
        assert_eq!(mirror.direction, Direction::Forward);
        assert_eq!(mirror.start, p.goal);
        assert_eq!(mirror.goal, p.start);
        assert_eq!(mirror.ac, 0.0);
        assert_eq!(mirror.ext_force, vec![0.0, 0.0]);
        assert_eq!(mirror.goal_thresh, None);
    }
}
