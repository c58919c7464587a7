// src/dmp/canonical.rs - Phase variable dynamics with phase-stopping
use serde::{Deserialize, Serialize};

/// Relative tolerance used when deciding that the phase reached its boundary.
const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// Direction in which the phase is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Phase decays from 1 toward the end of the horizon.
    Forward,
    /// Phase grows from the end of the horizon back to 1.
    Reverse,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalState {
    pub phase: f64,
    /// Phase-stopping rate factor applied on the last step, 1 when unstopped.
    pub rate: f64,
}

/// Canonical system `tau * dx/dt = ax * x`.
#[derive(Debug, Clone)]
pub struct CanonicalSystem {
    ax: f64,
    direction: Direction,
    end_phase: f64,
}

impl CanonicalSystem {
    /// Phase domain spanning `horizon_time` units of normalized time.
    pub fn new(ax: f64, direction: Direction, horizon_time: f64) -> Self {
        Self {
            ax,
            direction,
            end_phase: (ax * horizon_time).exp(),
        }
    }

    /// Phase domain covered by `steps` steps of size `dt` at time constant `tau`.
    pub fn for_horizon(ax: f64, direction: Direction, steps: usize, dt: f64, tau: f64) -> Self {
        Self::new(ax, direction, steps as f64 * dt / tau)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Smallest phase of the domain, reached at the end of a forward run.
    pub fn end_phase(&self) -> f64 {
        self.end_phase
    }

    pub fn initial_state(&self) -> CanonicalState {
        let phase = match self.direction {
            Direction::Forward => 1.0,
            Direction::Reverse => self.end_phase,
        };
        CanonicalState { phase, rate: 1.0 }
    }

    /// The phase value that terminates a run.
    pub fn boundary(&self) -> f64 {
        match self.direction {
            Direction::Forward => self.end_phase,
            Direction::Reverse => 1.0,
        }
    }

    /// Phase-stopping factor `1 / (1 + ac * |e|)`.
    pub fn rate_factor(ac: f64, tracking_error: f64) -> f64 {
        if ac > 0.0 && tracking_error != 0.0 {
            1.0 / (1.0 + ac * tracking_error.abs())
        } else {
            1.0
        }
    }

    /// Instantaneous `dx/dt` at `phase`.
    pub fn velocity(&self, phase: f64, tau: f64, ac: f64, tracking_error: f64) -> f64 {
        self.direction.sign() * self.ax * phase * Self::rate_factor(ac, tracking_error) / tau
    }

    /// Advance the phase by one step of `dt`. The exponential step is exact for
    /// a constant rate, so an unstopped run lands on the boundary after exactly
    /// the horizon's number of steps.
    pub fn step(
        &self,
        state: CanonicalState,
        dt: f64,
        tau: f64,
        ac: f64,
        tracking_error: f64,
    ) -> CanonicalState {
        let rate = Self::rate_factor(ac, tracking_error);
        let next = state.phase * (self.direction.sign() * self.ax * rate * dt / tau).exp();
        let phase = match self.direction {
            Direction::Forward => next.max(self.end_phase),
            Direction::Reverse => next.min(1.0),
        };
        CanonicalState { phase, rate }
    }

    pub fn is_finished(&self, state: &CanonicalState) -> bool {
        match self.direction {
            Direction::Forward => state.phase <= self.end_phase * (1.0 + BOUNDARY_TOLERANCE),
            Direction::Reverse => state.phase >= 1.0 - BOUNDARY_TOLERANCE,
        }
    }

    /// Nominal (unstopped) forward phase at each of `steps + 1` grid points.
    pub fn nominal_phases(ax: f64, steps: usize, dt: f64, tau: f64) -> Vec<f64> {
        (0..=steps)
            .map(|k| (ax * k as f64 * dt / tau).exp())
            .collect()
    }
}
