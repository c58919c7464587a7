// src/dmp/mod.rs - Reversible dynamic movement primitive engine
pub mod basis;
pub mod canonical;
pub mod demo;
pub mod error;
pub mod forcing;
pub mod generator;
pub mod model;
pub mod primitive;
pub mod shared;
pub mod trainer;
pub mod trajectory;
pub mod transformation;

pub use basis::BasisFunctionSet;
pub use canonical::{CanonicalState, CanonicalSystem, Direction};
pub use demo::{DemoKinematics, DemoTrajectory};
pub use error::DmpError;
pub use forcing::{ForcingTerm, LearnedForcing, ReferenceForcing};
pub use generator::{GeneratedTrajectory, Generator, RunPlan, Termination, MAX_HORIZON_MULTIPLE};
pub use model::{ModelError, TrainedModel};
pub use primitive::{ReversibleDmp, DEFAULT_AC};
pub use shared::SharedDmp;
pub use trainer::{Fit, Trainer};
pub use trajectory::{OutputTrajectory, TrajectoryPoint};
pub use transformation::{TransformationState, TransformationSystem};
