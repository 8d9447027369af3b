pub mod config;
pub mod error;
pub mod outcome;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{AxisConfig, ExecutorConfig, ExecutorKind, GridConfig, OutputConfig, PredatorConfig, ReproductionConfig, SweepConfig, SweepMode, SweepSettings};
pub use error::{ConfigError, OccupiedError};
pub use outcome::Outcome;
pub use sim_params::{ReproductionParams, TrialConfig};
pub use snapshot::{AgentKind, AgentSnapshot, PopulationSample, Snapshot};
