//! Predator-prey grid simulation and Monte-Carlo phase-diagram sweeps.
//!
//! A trial places prey and predators on a toroidal grid and steps them until
//! one species dies out or the step budget runs out. A sweep runs many seeded
//! trials per parameter point in parallel and reduces them to a
//! [`PhaseMatrix`] of majority outcomes.

pub mod agent_pool;
pub mod aggregate;
pub mod executor;
pub mod grid;
pub mod simulation;
pub mod sweep;

pub use aggregate::{OutcomeAggregator, OutcomeTally, PhaseMatrix};
pub use executor::{KernelExecutor, TrialExecutor, TrialResult, WorkerPoolExecutor};
pub use grid::{CellState, OccupancyGrid, Position};
pub use simulation::{run_trial, Simulation, TrialReport};
pub use sweep::{SweepDriver, SweepPlan, SweepPoint, TrialSpec};
