// src/dmp/shared.rs - Async handle for sharing one DMP between tasks
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::GenerationOverrides;
use crate::dmp::canonical::Direction;
use crate::dmp::demo::DemoTrajectory;
use crate::dmp::error::DmpError;
use crate::dmp::generator::GeneratedTrajectory;
use crate::dmp::model::TrainedModel;
use crate::dmp::primitive::ReversibleDmp;

/// Cloneable handle: generation takes the read lock, retraining the write lock.
#[derive(Debug, Clone)]
pub struct SharedDmp {
    inner: Arc<RwLock<ReversibleDmp>>,
}

impl SharedDmp {
    pub fn new(dmp: ReversibleDmp) -> Self {
        Self {
            inner: Arc::new(RwLock::new(dmp)),
        }
    }

    /// Fit `demo` while holding the write lock, so concurrent retrains apply
    /// in lock order and generation waits for the new weights. A failed fit
    /// leaves the previous model installed.
    pub async fn retrain(&self, demo: DemoTrajectory) -> Result<(), DmpError> {
        let mut dmp = self.inner.write().await;
        dmp.retrain(demo)?;
        tracing::debug!("Shared DMP retrained");
        Ok(())
    }

    pub async fn generate(
        &self,
        direction: Direction,
        overrides: GenerationOverrides,
    ) -> Result<GeneratedTrajectory, DmpError> {
        let dmp = self.inner.read().await;
        dmp.generate(direction, &overrides)
    }

    pub async fn is_trained(&self) -> bool {
        self.inner.read().await.is_trained()
    }

    pub async fn snapshot_model(&self) -> Option<TrainedModel> {
        self.inner.read().await.model().cloned()
    }
}
