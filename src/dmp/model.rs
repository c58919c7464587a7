// src/dmp/model.rs - Persisted form of a trained DMP
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DmpConfig;
use crate::dmp::basis::BasisFunctionSet;
use crate::dmp::error::DmpError;
use crate::dmp::forcing::{span_scale, LearnedForcing};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid model: {0}")]
    Invalid(#[from] DmpError),
}

/// Everything generation needs, detached from the demonstration samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub config: DmpConfig,
    pub dof: usize,
    pub rbf_num: usize,
    pub basis: BasisFunctionSet,
    /// `dof x rbf_num`
    pub weights: Array2<f64>,
    pub demo_start: Vec<f64>,
    pub demo_goal: Vec<f64>,
}

impl TrainedModel {
    pub fn validate(&self) -> Result<(), DmpError> {
        self.config
            .validate()
            .map_err(DmpError::InvalidConfiguration)?;
        if self.dof != self.config.dof {
            return Err(DmpError::InvalidConfiguration(format!(
                "model dof {} does not match config dof {}",
                self.dof, self.config.dof
            )));
        }
        if self.basis.len() != self.rbf_num {
            return Err(DmpError::InvalidConfiguration(format!(
                "{} basis functions stored for rbf_num {}",
                self.basis.len(),
                self.rbf_num
            )));
        }
        if self.weights.dim() != (self.dof, self.rbf_num) {
            return Err(DmpError::InvalidConfiguration(format!(
                "weight matrix is {:?}, expected ({}, {})",
                self.weights.dim(),
                self.dof,
                self.rbf_num
            )));
        }
        if self.weights.iter().any(|w| !w.is_finite()) {
            return Err(DmpError::NumericInstability("stored weights are not finite".to_string()));
        }
        if self.demo_start.len() != self.dof || self.demo_goal.len() != self.dof {
            return Err(DmpError::InvalidConfiguration(
                "demonstration boundaries do not match dof".to_string(),
            ));
        }
        // re-check the persisted basis the same way a freshly built one is
        BasisFunctionSet::from_parts(self.basis.centers().to_vec(), self.basis.widths().to_vec())?;
        Ok(())
    }

    /// Forcing term for a run between `start` and `goal`.
    pub fn learned_forcing(&self, start: &[f64], goal: &[f64]) -> LearnedForcing<'_> {
        let scale = span_scale(
            self.config.scaling,
            &self.demo_start,
            &self.demo_goal,
            start,
            goal,
        );
        LearnedForcing::new(&self.basis, &self.weights, scale)
    }

    pub fn to_json_string(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let model: TrainedModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_string()?)?;
        tracing::debug!("Saved model to {}", path.display());
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("Failed to read model file '{}': {}", path.display(), e);
            ModelError::Io(e)
        })?;
        Self::from_json_str(&contents).map_err(|e| {
            tracing::error!("Failed to load model '{}': {}", path.display(), e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> TrainedModel {
        let config = DmpConfig {
            rbf_num: 4,
            dof: 2,
            ..Default::default()
        };
        TrainedModel {
            basis: BasisFunctionSet::new(4, config.ax, config.end_time),
            weights: Array2::from_shape_vec((2, 4), vec![0.1, -2.5, 3.0, 1e-7, 0.0, 1.0, 2.0, 3.0])
                .unwrap(),
            demo_start: vec![0.0, 0.0],
            demo_goal: vec![1.0, 0.5],
            dof: 2,
            rbf_num: 4,
            config,
        }
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let original = model();
        let json = original.to_json_string().unwrap();
        let restored = TrainedModel::from_json_str(&json).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let mut broken = model();
        broken.weights = Array2::zeros((2, 3));
        let json = serde_json::to_string(&broken).unwrap();
        match TrainedModel::from_json_str(&json) {
            Err(ModelError::Invalid(DmpError::InvalidConfiguration(msg))) => {
                assert!(msg.contains("weight matrix"))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_garbage_is_a_json_error() {
        assert!(matches!(
            TrainedModel::from_json_str("{ not json"),
            Err(ModelError::Json(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let original = model();
        original.save_json(&path).unwrap();
        assert_eq!(TrainedModel::load_json(&path).unwrap(), original);
        assert!(matches!(
            TrainedModel::load_json(dir.path().join("missing.json")),
            Err(ModelError::Io(_))
        ));
    }
}
