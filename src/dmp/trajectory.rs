// src/dmp/trajectory.rs - Generated trajectory samples
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Motion state at a specific point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub time: f64,
    pub phase: f64,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub acceleration: Vec<f64>,
}

/// Ordered samples produced by one generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputTrajectory {
    dof: usize,
    points: Vec<TrajectoryPoint>,
}

impl OutputTrajectory {
    pub fn with_capacity(dof: usize, capacity: usize) -> Self {
        Self {
            dof,
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: TrajectoryPoint) {
        debug_assert_eq!(point.position.len(), self.dof);
        self.points.push(point);
    }

    pub fn dof(&self) -> usize {
        self.dof
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn first(&self) -> Option<&TrajectoryPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.time).collect()
    }

    pub fn phases(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.phase).collect()
    }

    /// Position sequence of one DOF.
    pub fn positions(&self, dof: usize) -> Vec<f64> {
        self.points.iter().map(|p| p.position[dof]).collect()
    }

    pub fn velocities(&self, dof: usize) -> Vec<f64> {
        self.points.iter().map(|p| p.velocity[dof]).collect()
    }

    pub fn accelerations(&self, dof: usize) -> Vec<f64> {
        self.points.iter().map(|p| p.acceleration[dof]).collect()
    }

    /// Positions as a `samples x dof` matrix.
    pub fn position_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.points.len(), self.dof), |(i, d)| self.points[i].position[d])
    }

    pub fn velocity_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.points.len(), self.dof), |(i, d)| self.points[i].velocity[d])
    }

    pub fn acceleration_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.points.len(), self.dof), |(i, d)| self.points[i].acceleration[d])
    }

    /// Largest per-DOF range of the positions.
    pub fn spatial_extent(&self) -> f64 {
        (0..self.dof)
            .map(|d| {
                let values = self.positions(d);
                let max = values.iter().cloned().fold(f64::MIN, f64::max);
                let min = values.iter().cloned().fold(f64::MAX, f64::min);
                max - min
            })
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(t: f64, x: f64, y: f64) -> TrajectoryPoint {
        TrajectoryPoint {
            time: t,
            phase: 1.0 - t,
            position: vec![x, y],
            velocity: vec![1.0, 0.0],
            acceleration: vec![0.0, 0.0],
        }
    }

    #[test]
    fn test_per_dof_accessors() {
        let mut traj = OutputTrajectory::with_capacity(2, 3);
        traj.push(point(0.0, 0.0, 5.0));
        traj.push(point(0.1, 0.5, 4.0));
        traj.push(point(0.2, 1.0, 3.0));
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.positions(0), vec![0.0, 0.5, 1.0]);
        assert_eq!(traj.positions(1), vec![5.0, 4.0, 3.0]);
        assert_eq!(traj.times(), vec![0.0, 0.1, 0.2]);
        let m = traj.position_matrix();
        assert_eq!(m.shape(), &[3, 2]);
        assert_eq!(m[[2, 1]], 3.0);
        assert_eq!(traj.spatial_extent(), 2.0);
    }
}
