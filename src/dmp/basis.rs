// src/dmp/basis.rs - Gaussian basis functions over the phase domain
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::dmp::error::DmpError;

/// Bank of Gaussian basis functions `psi_i(x) = exp(-h_i (x - c_i)^2)`.
///
/// Centers follow the nominal phase decay so that activation peaks are evenly
/// spaced in time; each width is the inverse square of the spacing to the next
/// center, which keeps the activation sum above `e^-1` anywhere on the domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisFunctionSet {
    centers: Vec<f64>,
    widths: Vec<f64>,
}

impl BasisFunctionSet {
    pub fn new(rbf_num: usize, ax: f64, end_time: f64) -> Self {
        let end_phase = (ax * end_time).exp();
        if rbf_num <= 1 {
            let span = (1.0 - end_phase).max(f64::EPSILON);
            return Self {
                centers: vec![1.0],
                widths: vec![1.0 / (span * span)],
            };
        }
        let centers: Vec<f64> = (0..rbf_num)
            .map(|i| (ax * end_time * i as f64 / (rbf_num - 1) as f64).exp())
            .collect();
        let mut widths = Vec::with_capacity(rbf_num);
        for i in 0..rbf_num {
            let spacing = if i + 1 < rbf_num {
                centers[i] - centers[i + 1]
            } else {
                centers[i - 1] - centers[i]
            };
            let spacing = spacing.abs().max(f64::EPSILON);
            widths.push(1.0 / (spacing * spacing));
        }
        Self { centers, widths }
    }

    /// Rebuild a set from persisted centers and widths.
    pub fn from_parts(centers: Vec<f64>, widths: Vec<f64>) -> Result<Self, DmpError> {
        if centers.is_empty() || centers.len() != widths.len() {
            return Err(DmpError::InvalidConfiguration(format!(
                "basis needs matching non-empty centers/widths, got {} and {}",
                centers.len(),
                widths.len()
            )));
        }
        if widths.iter().any(|h| !h.is_finite() || *h <= 0.0) || centers.iter().any(|c| !c.is_finite()) {
            return Err(DmpError::InvalidConfiguration(
                "basis centers must be finite and widths finite and > 0".to_string(),
            ));
        }
        Ok(Self { centers, widths })
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    pub fn activations(&self, phase: f64) -> Array1<f64> {
        self.centers
            .iter()
            .zip(&self.widths)
            .map(|(c, h)| (-h * (phase - c) * (phase - c)).exp())
            .collect()
    }

    pub fn activation_sum(&self, phase: f64) -> f64 {
        self.activations(phase).sum()
    }
}
