// src/dmp/error.rs - Error kinds raised by the DMP engine
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DmpError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Insufficient demonstration: {0}")]
    InsufficientDemonstration(String),
    #[error("Numeric instability: {0}")]
    NumericInstability(String),
    #[error("Generation truncated after {steps} steps at phase {phase:.6}")]
    GenerationTruncated { steps: usize, phase: f64 },
    #[error("Generation cancelled after {steps} steps")]
    GenerationCancelled { steps: usize },
    #[error("No trained weights; call train() first")]
    NotTrained,
}

impl DmpError {
    /// Whether the error aborts the call that raised it. Truncation and
    /// cancellation still hand back a partial trajectory.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            DmpError::GenerationTruncated { .. } | DmpError::GenerationCancelled { .. }
        )
    }
}
