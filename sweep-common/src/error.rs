use thiserror::Error;

/// Reasons a trial configuration (or a single sweep point) cannot be simulated.
///
/// These are raised before any agent is placed. A sweep treats them as fatal
/// for the offending point only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid size {0} is too small; the toroidal neighbourhood needs at least 3x3 cells")]
    GridTooSmall(usize),
    #[error("max_steps must be greater than 0")]
    ZeroMaxSteps,
    #[error("{prey} prey + {predators} predators do not fit in {cells} cells")]
    CapacityExceeded {
        prey: usize,
        predators: usize,
        cells: usize,
    },
    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
    #[error("predator initial energy must be positive, got {0}")]
    NonPositiveInitialEnergy(i32),
    #[error("predator move cost must not be negative, got {0}")]
    NegativeMoveCost(i32),
    #[error("invalid sweep coordinate: {0}")]
    InvalidSweepPoint(String),
    #[error("grid size {size} exceeds the kernel workspace capacity of {max}x{max}")]
    ExceedsKernelCapacity { size: usize, max: usize },
}

/// A placement targeted a cell that already holds an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cell ({x}, {y}) is already occupied")]
pub struct OccupiedError {
    pub x: usize,
    pub y: usize,
}
