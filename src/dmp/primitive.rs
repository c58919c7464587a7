// src/dmp/primitive.rs - Reversible DMP: demonstration, training and generation
use std::sync::atomic::AtomicBool;

use ndarray::Array2;

use crate::config::{DmpConfig, ForceCoupling, GenerationOverrides};
use crate::dmp::basis::BasisFunctionSet;
use crate::dmp::canonical::Direction;
use crate::dmp::demo::DemoTrajectory;
use crate::dmp::error::DmpError;
use crate::dmp::forcing::ReferenceForcing;
use crate::dmp::generator::{GeneratedTrajectory, Generator, RunPlan, MAX_HORIZON_MULTIPLE};
use crate::dmp::model::TrainedModel;
use crate::dmp::trainer::Trainer;
use crate::dmp::transformation::TransformationSystem;

/// Phase-stopping gain used when neither the call nor the config sets one.
pub const DEFAULT_AC: f64 = 1.0;

/// A DMP that learns one demonstration and replays it forward or reversed.
///
/// Training replaces the weights only when it succeeds; any error leaves the
/// previously trained model in place.
#[derive(Debug, Clone)]
pub struct ReversibleDmp {
    config: DmpConfig,
    demo: Option<DemoTrajectory>,
    model: Option<TrainedModel>,
}

impl ReversibleDmp {
    pub fn new(config: DmpConfig) -> Result<Self, DmpError> {
        config.validate().map_err(DmpError::InvalidConfiguration)?;
        Ok(Self {
            config,
            demo: None,
            model: None,
        })
    }

    /// Restore a trained instance from a persisted model.
    pub fn from_model(model: TrainedModel) -> Result<Self, DmpError> {
        model.validate()?;
        Ok(Self {
            config: model.config.clone(),
            demo: None,
            model: Some(model),
        })
    }

    pub fn config(&self) -> &DmpConfig {
        &self.config
    }

    pub fn demo(&self) -> Option<&DemoTrajectory> {
        self.demo.as_ref()
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn weights(&self) -> Option<&Array2<f64>> {
        self.model.as_ref().map(|m| &m.weights)
    }

    pub fn load_demo_trajectory(&mut self, demo: DemoTrajectory) -> Result<(), DmpError> {
        self.check_dof(&demo)?;
        tracing::debug!(
            "Loaded demonstration: {} samples, {} dof, {:.3}s",
            demo.len(),
            demo.dof(),
            demo.duration()
        );
        self.demo = Some(demo);
        Ok(())
    }

    /// Fit the weights to the loaded demonstration.
    pub fn train(&mut self) -> Result<&TrainedModel, DmpError> {
        let demo = self.demo.as_ref().ok_or_else(|| {
            DmpError::InsufficientDemonstration("no demonstration loaded".to_string())
        })?;
        let model = self.fit_model(demo)?;
        Ok(&*self.model.insert(model))
    }

    /// Load `demo` and train on it in one step. On failure both the previous
    /// demonstration and the previous weights are kept.
    pub fn retrain(&mut self, demo: DemoTrajectory) -> Result<&TrainedModel, DmpError> {
        let model = self.fit_model(&demo)?;
        Ok(self.install(demo, model))
    }

    fn install(&mut self, demo: DemoTrajectory, model: TrainedModel) -> &TrainedModel {
        self.demo = Some(demo);
        self.model.insert(model)
    }

    fn fit_model(&self, demo: &DemoTrajectory) -> Result<TrainedModel, DmpError> {
        self.check_dof(demo)?;
        let config = &self.config;
        let basis = BasisFunctionSet::new(config.rbf_num, config.ax, config.end_time);
        let fit = Trainer::from_config(config).fit(demo, &basis)?;
        tracing::debug!(
            "Trained {} basis functions per dof ({} samples skipped)",
            config.rbf_num,
            fit.skipped_samples
        );
        Ok(TrainedModel {
            config: config.clone(),
            dof: config.dof,
            rbf_num: config.rbf_num,
            basis,
            weights: fit.weights,
            demo_start: demo.start().to_vec(),
            demo_goal: demo.goal().to_vec(),
        })
    }

    fn check_dof(&self, demo: &DemoTrajectory) -> Result<(), DmpError> {
        if demo.dof() != self.config.dof {
            return Err(DmpError::InvalidConfiguration(format!(
                "demonstration has {} dof, configured for {}",
                demo.dof(),
                self.config.dof
            )));
        }
        Ok(())
    }

    /// Merge `overrides` over the configured generation defaults and fill the
    /// rest from the trained model. Reverse runs default to starting at the
    /// demonstrated goal and ending at the demonstrated start.
    pub fn resolve_plan(
        &self,
        direction: Direction,
        overrides: &GenerationOverrides,
    ) -> Result<RunPlan, DmpError> {
        let model = self.model.as_ref().ok_or(DmpError::NotTrained)?;
        let dof = self.config.dof;
        let merged = overrides.merged_over(&self.config.generation);
        merged.validate(dof).map_err(DmpError::InvalidConfiguration)?;

        let (default_start, default_goal) = match direction {
            Direction::Forward => (&model.demo_start, &model.demo_goal),
            Direction::Reverse => (&model.demo_goal, &model.demo_start),
        };
        let tau = merged.tau.unwrap_or(self.config.tau);
        let dt = merged.dt.unwrap_or(self.config.dt);
        let ext_force = match merged.coupling.unwrap_or(ForceCoupling::Additive) {
            ForceCoupling::Additive => merged.ext_force.unwrap_or_else(|| vec![0.0; dof]),
            ForceCoupling::Suppressed => vec![0.0; dof],
        };
        let horizon_steps = self
            .config
            .checked_horizon_steps(tau, dt)
            .map_err(DmpError::InvalidConfiguration)?;
        Ok(RunPlan {
            direction,
            start: merged.start.unwrap_or_else(|| default_start.clone()),
            goal: merged.goal.unwrap_or_else(|| default_goal.clone()),
            dy: merged.dy.unwrap_or_else(|| vec![0.0; dof]),
            tau,
            dt,
            ac: merged.ac.unwrap_or(DEFAULT_AC),
            ext_force,
            goal_thresh: self.config.goal_thresh,
            horizon_steps,
            step_cap: horizon_steps.saturating_mul(MAX_HORIZON_MULTIPLE),
        })
    }

    pub fn generate(
        &self,
        direction: Direction,
        overrides: &GenerationOverrides,
    ) -> Result<GeneratedTrajectory, DmpError> {
        self.run(direction, overrides, None)
    }

    /// Like [`generate`](Self::generate), stopping early once `cancel` is set.
    pub fn generate_with_cancel(
        &self,
        direction: Direction,
        overrides: &GenerationOverrides,
        cancel: &AtomicBool,
    ) -> Result<GeneratedTrajectory, DmpError> {
        self.run(direction, overrides, Some(cancel))
    }

    pub fn generate_forward(
        &self,
        overrides: &GenerationOverrides,
    ) -> Result<GeneratedTrajectory, DmpError> {
        self.generate(Direction::Forward, overrides)
    }

    pub fn generate_reverse_trajectory(
        &self,
        overrides: &GenerationOverrides,
    ) -> Result<GeneratedTrajectory, DmpError> {
        self.generate(Direction::Reverse, overrides)
    }

    fn run(
        &self,
        direction: Direction,
        overrides: &GenerationOverrides,
        cancel: Option<&AtomicBool>,
    ) -> Result<GeneratedTrajectory, DmpError> {
        let plan = self.resolve_plan(direction, overrides)?;
        let model = self.model.as_ref().ok_or(DmpError::NotTrained)?;
        let system = TransformationSystem::from_config(&self.config);
        let generator = Generator::new(self.config.ax, system);

        let generated = match direction {
            Direction::Forward => {
                let forcing = model.learned_forcing(&plan.start, &plan.goal);
                generator.run(&forcing, &plan, cancel)
            }
            Direction::Reverse => {
                let nominal = plan.mirrored_nominal();
                let forcing = model.learned_forcing(&nominal.start, &nominal.goal);
                let rollout = generator.run(&forcing, &nominal, None);
                if !rollout.is_complete() {
                    return Err(DmpError::NumericInstability(format!(
                        "nominal rollout for reversal ended {:?}",
                        rollout.termination
                    )));
                }
                check_finite(&rollout)?;
                let reference = ReferenceForcing::from_rollout(
                    &rollout.trajectory,
                    plan.goal.clone(),
                    system,
                    plan.tau,
                    plan.dt,
                );
                generator.run(&reference, &plan, cancel)
            }
        };
        check_finite(&generated)?;
        Ok(generated)
    }
}

fn check_finite(generated: &GeneratedTrajectory) -> Result<(), DmpError> {
    let diverged = generated.trajectory.points().iter().position(|p| {
        p.position
            .iter()
            .chain(&p.velocity)
            .any(|v| !v.is_finite())
    });
    match diverged {
        Some(index) => Err(DmpError::NumericInstability(format!(
            "trajectory diverged at sample {}",
            index
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_demo() -> DemoTrajectory {
        let positions = (0..=100).map(|i| vec![i as f64 / 100.0, 0.0]).collect();
        DemoTrajectory::from_uniform(positions, 0.01).unwrap()
    }

    fn trained() -> ReversibleDmp {
        let mut dmp = ReversibleDmp::new(DmpConfig::with_dof(2)).unwrap();
        dmp.load_demo_trajectory(line_demo()).unwrap();
        dmp.train().unwrap();
        dmp
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = DmpConfig {
            ax: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            ReversibleDmp::new(config),
            Err(DmpError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_generate_before_train_fails() {
        let dmp = ReversibleDmp::new(DmpConfig::default()).unwrap();
        assert_eq!(
            dmp.generate_forward(&GenerationOverrides::default()).unwrap_err(),
            DmpError::NotTrained
        );
    }

    #[test]
    fn test_train_without_demo_fails() {
        let mut dmp = ReversibleDmp::new(DmpConfig::default()).unwrap();
        assert!(matches!(
            dmp.train(),
            Err(DmpError::InsufficientDemonstration(_))
        ));
    }

    #[test]
    fn test_demo_dof_must_match() {
        let mut dmp = ReversibleDmp::new(DmpConfig::with_dof(3)).unwrap();
        assert!(matches!(
            dmp.load_demo_trajectory(line_demo()),
            Err(DmpError::InvalidConfiguration(_))
        ));
        assert!(dmp.demo().is_none());
    }

    #[test]
    fn test_reverse_defaults_swap_demo_boundaries() {
        let dmp = trained();
        let plan = dmp
            .resolve_plan(Direction::Reverse, &GenerationOverrides::default())
            .unwrap();
        assert_eq!(plan.start, vec![1.0, 0.0]);
        assert_eq!(plan.goal, vec![0.0, 0.0]);
        assert_eq!(plan.ac, DEFAULT_AC);
        assert_eq!(plan.horizon_steps, 1000);
        assert_eq!(plan.step_cap, 10_000);
    }

    #[test]
    fn test_call_overrides_win_over_config_defaults() {
        let mut config = DmpConfig::with_dof(2);
        config.generation = GenerationOverrides::default()
            .with_ac(5.0)
            .with_ext_force(vec![1.0, 2.0]);
        let mut dmp = ReversibleDmp::new(config).unwrap();
        dmp.load_demo_trajectory(line_demo()).unwrap();
        dmp.train().unwrap();

        let plan = dmp
            .resolve_plan(
                Direction::Forward,
                &GenerationOverrides::default().with_ac(0.5).with_speed(2.0),
            )
            .unwrap();
        assert_eq!(plan.ac, 0.5);
        assert_eq!(plan.tau, 0.5);
        assert_eq!(plan.horizon_steps, 500);
        assert_eq!(plan.ext_force, vec![1.0, 2.0]);

        let suppressed = dmp
            .resolve_plan(
                Direction::Forward,
                &GenerationOverrides::default().with_coupling(ForceCoupling::Suppressed),
            )
            .unwrap();
        assert_eq!(suppressed.ext_force, vec![0.0, 0.0]);
    }

    #[test]
    fn test_wrong_override_length_is_rejected() {
        let dmp = trained();
        let err = dmp
            .generate_forward(&GenerationOverrides::default().with_goal(vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, DmpError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_oversized_horizon_override_is_rejected() {
        let dmp = trained();
        for overrides in [
            GenerationOverrides::default().with_tau(1e300),
            GenerationOverrides::default().with_dt(1e-300),
        ] {
            for direction in [Direction::Forward, Direction::Reverse] {
                let err = dmp.resolve_plan(direction, &overrides).unwrap_err();
                assert!(matches!(err, DmpError::InvalidConfiguration(_)));
            }
        }
        let plan = dmp
            .resolve_plan(Direction::Forward, &GenerationOverrides::default().with_tau(2.0))
            .unwrap();
        assert_eq!(plan.horizon_steps, 2000);
        assert_eq!(plan.step_cap, 20_000);
    }

    #[test]
    fn test_retrain_with_wrong_dof_keeps_weights() {
        let mut dmp = trained();
        let before = dmp.weights().unwrap().clone();
        let demo = DemoTrajectory::from_uniform(vec![vec![0.0], vec![1.0]], 0.1).unwrap();
        assert!(dmp.retrain(demo).is_err());
        assert_eq!(dmp.weights().unwrap(), &before);
        assert_eq!(dmp.demo().unwrap(), &line_demo());
    }
}
