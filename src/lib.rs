// reversible_dmp: learn a motion from one demonstration and replay it forward or reversed

pub mod config;
pub mod dmp;
pub mod io;

pub use config::{load_config, ConfigError, DmpConfig, ForceCoupling, ForcingScaling, GenerationOverrides};
pub use dmp::{
    Direction, DemoTrajectory, DmpError, GeneratedTrajectory, ModelError, OutputTrajectory,
    ReversibleDmp, SharedDmp, Termination, TrainedModel, TrajectoryPoint,
};
pub use io::{read_demo_csv, write_trajectory_csv, TrajectoryIoError};
