use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::{ReproductionParams, TrialConfig};
use std::path::Path;

// Grid dimensions and the step budget of every trial
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    pub size: usize,
    pub max_steps: u32,
}

// Predator energy budget, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PredatorConfig {
    #[serde(default = "default_initial_energy")]
    pub initial_energy: i32,
    #[serde(default = "default_energy_gain")]
    pub energy_gain_from_food: i32,
    #[serde(default = "default_move_cost")]
    pub move_cost: i32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ReproductionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_prey_probability")]
    pub prey_probability: f64,
    #[serde(default = "default_predator_probability")]
    pub predator_probability: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// x = prey/predator ratio, y = agents per grid cell
    RatioDensity,
    /// x = initial prey, y = initial predators
    Counts,
}

/// Values along one sweep axis: either an explicit list or a half-open
/// `[start, stop)` range walked in `step` increments.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AxisConfig {
    List(Vec<f64>),
    Range { start: f64, stop: f64, step: f64 },
}

impl AxisConfig {
    pub fn values(&self) -> Vec<f64> {
        match self {
            AxisConfig::List(values) => values.clone(),
            AxisConfig::Range { start, stop, step } => {
                if *step <= 0.0 || stop <= start {
                    return Vec::new();
                }
                let count = ((stop - start) / step).ceil() as usize;
                (0..count).map(|i| start + i as f64 * step).collect()
            }
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SweepSettings {
    pub mode: SweepMode,
    pub x: AxisConfig,
    pub y: AxisConfig,
    pub num_simulations: usize,
    #[serde(default)]
    pub base_seed: u64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    WorkerPool,
    Kernel,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ExecutorConfig {
    #[serde(default = "default_executor_kind")]
    pub kind: ExecutorKind,
    /// Worker threads; 0 lets rayon decide.
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_lanes_per_block")]
    pub lanes_per_block: usize,
    #[serde(default = "default_max_grid_dim")]
    pub max_grid_dim: usize,
}

// Where and how the phase matrix is handed to the plotting side
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default = "default_save_matrix")]
    pub save_matrix: bool,
    pub format: Option<String>, // "json", "csv", "bincode", "messagepack"
}

// Main configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SweepConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub predators: PredatorConfig,
    #[serde(default)]
    pub reproduction: ReproductionConfig,
    pub sweep: SweepSettings,
    #[serde(default)]
    pub executor: ExecutorConfig,
    pub output: OutputConfig,
}

impl Default for PredatorConfig {
    fn default() -> Self {
        PredatorConfig {
            initial_energy: default_initial_energy(),
            energy_gain_from_food: default_energy_gain(),
            move_cost: default_move_cost(),
        }
    }
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        ReproductionConfig {
            enabled: false,
            prey_probability: default_prey_probability(),
            predator_probability: default_predator_probability(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            kind: default_executor_kind(),
            threads: 0,
            lanes_per_block: default_lanes_per_block(),
            max_grid_dim: default_max_grid_dim(),
        }
    }
}

impl SweepConfig {
    /// Loads the sweep configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;
        Ok(config)
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SweepConfig = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sweep.num_simulations == 0 {
            anyhow::bail!("num_simulations must be greater than 0.");
        }
        if self.sweep.x.values().is_empty() || self.sweep.y.values().is_empty() {
            anyhow::bail!("Both sweep axes must contain at least one value.");
        }
        if self.executor.lanes_per_block == 0 {
            anyhow::bail!("lanes_per_block must be greater than 0.");
        }
        // Per-trial constraints (capacity, energy, probabilities) are checked
        // per sweep point so one bad point does not reject the whole file.
        self.trial_template().with_counts(0, 0).validate()?;
        Ok(())
    }

    /// Converts the configuration into the per-trial parameters shared by every sweep point.
    /// Initial populations are left at zero for the sweep driver to fill in.
    pub fn trial_template(&self) -> TrialConfig {
        TrialConfig {
            grid_size: self.grid.size,
            max_steps: self.grid.max_steps,
            initial_prey: 0,
            initial_predators: 0,
            reproduction_enabled: self.reproduction.enabled,
            reproduction_params: ReproductionParams {
                prey_reproduce_prob: self.reproduction.prey_probability,
                predator_reproduce_prob: self.reproduction.predator_probability,
                energy_gain_from_food: self.predators.energy_gain_from_food,
                initial_energy: self.predators.initial_energy,
                move_cost: self.predators.move_cost,
            },
        }
    }
}

fn default_initial_energy() -> i32 {
    5
}

fn default_energy_gain() -> i32 {
    5
}

fn default_move_cost() -> i32 {
    1
}

fn default_prey_probability() -> f64 {
    0.04
}

fn default_predator_probability() -> f64 {
    0.05
}

fn default_executor_kind() -> ExecutorKind {
    ExecutorKind::WorkerPool
}

fn default_lanes_per_block() -> usize {
    64 // one block of device lanes
}

fn default_max_grid_dim() -> usize {
    64
}

fn default_save_matrix() -> bool {
    true
}
