use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Prey,
    Predator,
}

/// One agent as seen by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub x: usize,
    pub y: usize,
    pub kind: AgentKind,
    /// Only predators carry energy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<i32>,
}

/// Population counts after a given step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationSample {
    pub step: u32,
    pub prey: usize,
    pub predators: usize,
}

/// A snapshot of a running trial, for live rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of completed steps.
    pub step: u32,
    pub grid_size: usize,
    pub prey_count: usize,
    pub predator_count: usize,
    /// Prey first (collection order), then predators (collection order).
    pub agents: Vec<AgentSnapshot>,
}
