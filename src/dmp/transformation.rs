// src/dmp/transformation.rs - Per-DOF critically damped spring driven by the forcing term
use crate::config::DmpConfig;

/// Per-DOF position, velocity and acceleration of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationState {
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    /// Acceleration used by the most recent step.
    pub acceleration: Vec<f64>,
}

impl TransformationState {
    pub fn new(position: Vec<f64>, velocity: Vec<f64>) -> Self {
        let acceleration = vec![0.0; position.len()];
        Self {
            position,
            velocity,
            acceleration,
        }
    }

    pub fn dof(&self) -> usize {
        self.position.len()
    }
}

/// `tau² ÿ = K (g - y) - D tau ẏ + f + F_ext`, integrated with explicit Euler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformationSystem {
    stiffness: f64,
    damping: f64,
}

impl TransformationSystem {
    pub fn new(stiffness: f64, damping: f64) -> Self {
        Self { stiffness, damping }
    }

    pub fn from_config(config: &DmpConfig) -> Self {
        Self::new(config.stiffness(), config.damping)
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn acceleration(
        &self,
        position: f64,
        velocity: f64,
        goal: f64,
        forcing: f64,
        external: f64,
        tau: f64,
    ) -> f64 {
        (self.stiffness * (goal - position) - self.damping * tau * velocity + forcing + external)
            / (tau * tau)
    }

    /// Forcing that makes the system follow a given position/velocity/acceleration.
    pub fn forcing_target(
        &self,
        position: f64,
        velocity: f64,
        acceleration: f64,
        goal: f64,
        tau: f64,
    ) -> f64 {
        tau * tau * acceleration - self.stiffness * (goal - position) + self.damping * tau * velocity
    }

    /// One Euler step for every DOF.
    pub fn step(
        &self,
        state: &mut TransformationState,
        goal: &[f64],
        forcing: &[f64],
        external: &[f64],
        tau: f64,
        dt: f64,
    ) {
        for d in 0..state.dof() {
            let acc = self.acceleration(
                state.position[d],
                state.velocity[d],
                goal[d],
                forcing[d],
                external[d],
                tau,
            );
            state.position[d] += dt * state.velocity[d];
            state.velocity[d] += dt * acc;
            state.acceleration[d] = acc;
        }
    }

    /// Euclidean distance between the positions of two states.
    pub fn tracking_error(ideal: &TransformationState, actual: &TransformationState) -> f64 {
        ideal
            .position
            .iter()
            .zip(&actual.position)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}
