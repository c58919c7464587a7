// src/dmp/demo.rs - Demonstrated trajectory and its finite-difference kinematics
use serde::{Deserialize, Serialize};

use crate::dmp::error::DmpError;

/// One demonstrated motion: strictly increasing timestamps with a position
/// vector of `dof` entries per sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoTrajectory {
    times: Vec<f64>,
    positions: Vec<Vec<f64>>,
}

/// Demonstration resampled onto the integration grid.
#[derive(Debug, Clone)]
pub struct DemoKinematics {
    pub positions: Vec<Vec<f64>>,
    pub velocities: Vec<Vec<f64>>,
    pub accelerations: Vec<Vec<f64>>,
}

impl DemoTrajectory {
    pub fn new(times: Vec<f64>, positions: Vec<Vec<f64>>) -> Result<Self, DmpError> {
        if times.len() < 2 || positions.len() < 2 {
            return Err(DmpError::InsufficientDemonstration(format!(
                "need at least 2 samples, got {}",
                positions.len()
            )));
        }
        if times.len() != positions.len() {
            return Err(DmpError::InvalidConfiguration(format!(
                "{} timestamps for {} samples",
                times.len(),
                positions.len()
            )));
        }
        let dof = positions[0].len();
        if dof == 0 {
            return Err(DmpError::InvalidConfiguration("samples have no coordinates".to_string()));
        }
        for (i, sample) in positions.iter().enumerate() {
            if sample.len() != dof {
                return Err(DmpError::InvalidConfiguration(format!(
                    "sample {} has {} coordinates, expected {}",
                    i,
                    sample.len(),
                    dof
                )));
            }
            if sample.iter().any(|v| !v.is_finite()) {
                return Err(DmpError::InvalidConfiguration(format!("sample {} is not finite", i)));
            }
        }
        if times.iter().any(|t| !t.is_finite()) || times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DmpError::InvalidConfiguration(
                "timestamps must be finite and strictly increasing".to_string(),
            ));
        }
        if positions.iter().all(|p| p == &positions[0]) {
            return Err(DmpError::InsufficientDemonstration(
                "all samples are identical; velocity is undefined".to_string(),
            ));
        }
        Ok(Self { times, positions })
    }

    /// Samples recorded at a fixed interval, starting at t = 0.
    pub fn from_uniform(positions: Vec<Vec<f64>>, sample_interval: f64) -> Result<Self, DmpError> {
        if !sample_interval.is_finite() || sample_interval <= 0.0 {
            return Err(DmpError::InvalidConfiguration(format!(
                "sample interval must be > 0, got {}",
                sample_interval
            )));
        }
        let times = (0..positions.len()).map(|i| i as f64 * sample_interval).collect();
        Self::new(times, positions)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn dof(&self) -> usize {
        self.positions[0].len()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn positions(&self) -> &[Vec<f64>] {
        &self.positions
    }

    pub fn start(&self) -> &[f64] {
        &self.positions[0]
    }

    pub fn goal(&self) -> &[f64] {
        &self.positions[self.positions.len() - 1]
    }

    pub fn duration(&self) -> f64 {
        self.times[self.times.len() - 1] - self.times[0]
    }

    /// Linearly interpolated position at time `t`, clamped to the recorded range.
    pub fn sample_at(&self, t: f64) -> Vec<f64> {
        let upper = self.times.partition_point(|&ti| ti <= t);
        if upper == 0 {
            return self.positions[0].clone();
        }
        if upper >= self.times.len() {
            return self.goal().to_vec();
        }
        let (t0, t1) = (self.times[upper - 1], self.times[upper]);
        let alpha = (t - t0) / (t1 - t0);
        self.positions[upper - 1]
            .iter()
            .zip(&self.positions[upper])
            .map(|(a, b)| a + alpha * (b - a))
            .collect()
    }

    /// `steps + 1` evenly spaced samples covering the whole demonstration.
    pub fn resample(&self, steps: usize) -> Vec<Vec<f64>> {
        let t0 = self.times[0];
        let span = self.duration();
        let mut samples: Vec<Vec<f64>> = (0..=steps)
            .map(|k| self.sample_at(t0 + span * k as f64 / steps as f64))
            .collect();
        // pin the endpoints against rounding in the time grid
        samples[0] = self.start().to_vec();
        samples[steps] = self.goal().to_vec();
        samples
    }

    /// Resample onto `steps` integration steps of length `dt` and differentiate.
    ///
    /// Forward differences are used so that explicit Euler integration of the
    /// recovered accelerations reproduces the resampled positions exactly; the
    /// last velocity is held and the trailing accelerations are zero.
    pub fn kinematics(&self, steps: usize, dt: f64) -> DemoKinematics {
        let positions = self.resample(steps);
        let velocities = forward_difference(&positions, dt);
        let accelerations = forward_difference(&velocities, dt);
        DemoKinematics {
            positions,
            velocities,
            accelerations,
        }
    }
}

pub(crate) fn forward_difference(series: &[Vec<f64>], dt: f64) -> Vec<Vec<f64>> {
    let n = series.len();
    let mut out: Vec<Vec<f64>> = Vec::with_capacity(n);
    for k in 0..n.saturating_sub(1) {
        out.push(
            series[k + 1]
                .iter()
                .zip(&series[k])
                .map(|(next, cur)| (next - cur) / dt)
                .collect(),
        );
    }
    if let Some(last) = out.last().cloned() {
        out.push(last);
    } else if let Some(first) = series.first() {
        out.push(vec![0.0; first.len()]);
    }
    out
}
