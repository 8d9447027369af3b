use crate::agent_pool::{AgentPool, OccupancyError};
use crate::grid::{CellState, OccupancyGrid, Position};
use log::{error, trace};
use predator_prey_common::{
    AgentKind, AgentSnapshot, ConfigError, OccupiedError, Outcome, PopulationSample, Snapshot, TrialConfig,
};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of one trial run to termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialReport {
    pub outcome: Outcome,
    /// Completed steps when the trial stopped.
    pub steps: u32,
    pub final_prey: usize,
    pub final_predators: usize,
}

/// Why an explicit starting layout was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Occupied(#[from] OccupiedError),
    #[error("position ({x}, {y}) is outside a {size}x{size} grid")]
    OutOfBounds { x: usize, y: usize, size: usize },
}

/// One trial's world: grid, agents and step counter.
///
/// All randomness comes from the generator passed into each call, so a trial
/// is fully reproducible from its seed.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: TrialConfig,
    grid: OccupancyGrid,
    pool: AgentPool,
    step_count: u32,
    /// Predator positions for the current predator phase, kept to reuse the allocation.
    acting: Vec<Position>,
    history: Option<Vec<PopulationSample>>,
}

/// Runs a fresh trial from `config` to termination.
pub fn run_trial<R: Rng + ?Sized>(config: &TrialConfig, rng: &mut R) -> Result<TrialReport, ConfigError> {
    let mut sim = Simulation::new(config, rng)?;
    Ok(sim.run_to_end(rng))
}

impl Simulation {
    /// Validates `config` and places the initial populations at random.
    pub fn new<R: Rng + ?Sized>(config: &TrialConfig, rng: &mut R) -> Result<Self, ConfigError> {
        Self::with_capacity(config, config.grid_size, rng)
    }

    /// Like [`Simulation::new`], but reserves buffers for grids up to `capacity x capacity`
    /// so the instance can later be [`reset`](Simulation::reset) without reallocating.
    pub fn with_capacity<R: Rng + ?Sized>(
        config: &TrialConfig,
        capacity: usize,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = capacity.max(config.grid_size);
        let mut sim = Self {
            config: *config,
            grid: OccupancyGrid::with_capacity(config.grid_size, capacity),
            pool: AgentPool::with_capacity(capacity * capacity),
            step_count: 0,
            acting: Vec::with_capacity(capacity * capacity),
            history: None,
        };
        sim.place_initial(rng)?;
        Ok(sim)
    }

    /// Builds a trial from explicit agent positions instead of random placement.
    /// `config.initial_prey`/`initial_predators` are replaced by the layout sizes.
    pub fn from_layout(
        config: &TrialConfig,
        prey: &[Position],
        predators: &[(Position, i32)],
    ) -> Result<Self, LayoutError> {
        let config = config.with_counts(prey.len(), predators.len());
        config.validate()?;
        let size = config.grid_size;
        let mut sim = Self {
            config,
            grid: OccupancyGrid::new(size),
            pool: AgentPool::with_capacity(size * size),
            step_count: 0,
            acting: Vec::new(),
            history: None,
        };
        let all = prey.iter().copied().chain(predators.iter().map(|(p, _)| *p));
        if let Some(bad) = all.into_iter().find(|p| p.x >= size || p.y >= size) {
            return Err(LayoutError::OutOfBounds { x: bad.x, y: bad.y, size });
        }
        for &pos in prey {
            sim.pool.add_prey(&mut sim.grid, pos)?;
        }
        for &(pos, energy) in predators {
            sim.pool.add_predator(&mut sim.grid, pos, energy)?;
        }
        Ok(sim)
    }

    /// Starts a new trial in this instance, keeping its allocations.
    pub fn reset<R: Rng + ?Sized>(&mut self, config: &TrialConfig, rng: &mut R) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = *config;
        self.grid.reset(config.grid_size);
        self.pool.clear();
        self.step_count = 0;
        if let Some(history) = self.history.as_mut() {
            history.clear();
        }
        self.place_initial(rng)?;
        if self.history.is_some() {
            self.record_population();
        }
        Ok(())
    }

    /// Starts keeping per-step population counts, beginning with the current state.
    pub fn enable_history(&mut self) {
        if self.history.is_none() {
            self.history = Some(Vec::with_capacity(self.config.max_steps as usize + 1));
            self.record_population();
        }
    }

    pub fn history(&self) -> &[PopulationSample] {
        self.history.as_deref().unwrap_or(&[])
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn pool(&self) -> &AgentPool {
        &self.pool
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn verify_occupancy(&self) -> Result<(), OccupancyError> {
        self.pool.verify(&self.grid)
    }

    // --- Initial placement ---

    fn place_initial<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), ConfigError> {
        let energy = self.config.reproduction_params.initial_energy;
        for _ in 0..self.config.initial_prey {
            let pos = self.random_empty_cell(rng).ok_or_else(|| self.capacity_error())?;
            if let Err(e) = self.pool.add_prey(&mut self.grid, pos) {
                error!("Initial prey placement hit an occupied cell: {}", e);
            }
        }
        // Predators only land on empty cells; prey are never overwritten.
        for _ in 0..self.config.initial_predators {
            let pos = self.random_empty_cell(rng).ok_or_else(|| self.capacity_error())?;
            if let Err(e) = self.pool.add_predator(&mut self.grid, pos, energy) {
                error!("Initial predator placement hit an occupied cell: {}", e);
            }
        }
        Ok(())
    }

    /// Rejection-samples a free cell. After `4 * cells` misses it picks uniformly
    /// among the remaining free cells, so it returns `None` only on a full grid.
    fn random_empty_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        let size = self.grid.size();
        let max_attempts = 4 * self.grid.num_cells();
        for _ in 0..max_attempts {
            let pos = Position::new(rng.random_range(0..size), rng.random_range(0..size));
            if self.grid.is_empty(pos) {
                return Some(pos);
            }
        }
        self.grid.empty_cells().choose(rng).copied()
    }

    fn capacity_error(&self) -> ConfigError {
        ConfigError::CapacityExceeded {
            prey: self.config.initial_prey,
            predators: self.config.initial_predators,
            cells: self.config.num_cells(),
        }
    }

    // --- Stepping ---

    /// How the trial ended, or `None` while it should keep running.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.pool.prey.is_empty() {
            Some(Outcome::PreyExtinct)
        } else if self.pool.predators.is_empty() {
            Some(Outcome::PredatorExtinct)
        } else if self.step_count >= self.config.max_steps {
            Some(Outcome::Coexistence)
        } else {
            None
        }
    }

    /// Steps until a termination condition holds. Runs at most `max_steps` steps.
    pub fn run_to_end<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TrialReport {
        loop {
            if let Some(outcome) = self.outcome() {
                return TrialReport {
                    outcome,
                    steps: self.step_count,
                    final_prey: self.pool.prey_count(),
                    final_predators: self.pool.predator_count(),
                };
            }
            self.step(rng);
        }
    }

    /// Advances the world by one step: every prey moves, then every predator acts.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.move_prey(rng);
        self.act_predators(rng);
        self.step_count += 1;

        debug_assert!(
            self.verify_occupancy().is_ok(),
            "occupancy broken after step {}: {:?}",
            self.step_count,
            self.verify_occupancy()
        );
        trace!(
            "Step {} | Prey: {} | Predators: {}",
            self.step_count,
            self.pool.prey_count(),
            self.pool.predator_count()
        );
        if self.history.is_some() {
            self.record_population();
        }
    }

    fn record_population(&mut self) {
        let sample = PopulationSample {
            step: self.step_count,
            prey: self.pool.prey_count(),
            predators: self.pool.predator_count(),
        };
        if let Some(history) = self.history.as_mut() {
            history.push(sample);
        }
    }

    /// Prey phase, in collection order. Newborn prey do not move until the next step.
    fn move_prey<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let breed = self.config.reproduction_enabled;
        let birth_prob = self.config.reproduction_params.prey_reproduce_prob;

        let count = self.pool.prey.len();
        for idx in 0..count {
            let pos = self.pool.prey[idx];
            let mut neighbors = self.grid.neighbors(pos);
            neighbors.shuffle(rng);
            if let Some(&target) = neighbors.iter().find(|&&n| self.grid.is_empty(n)) {
                self.pool.move_prey(&mut self.grid, idx, target);
            }

            if breed && rng.random::<f64>() < birth_prob {
                neighbors.shuffle(rng);
                if let Some(&birth) = neighbors.iter().find(|&&n| self.grid.is_empty(n)) {
                    if let Err(e) = self.pool.add_prey(&mut self.grid, birth) {
                        error!("Prey birth failed: {}", e);
                    }
                }
            }
        }
    }

    /// Predator phase, in a freshly shuffled order. Each predator sees the moves of
    /// those before it; offspring born this step act from the next step on.
    fn act_predators<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.pool.predators.shuffle(rng);
        let mut acting = std::mem::take(&mut self.acting);
        acting.clear();
        acting.extend_from_slice(&self.pool.predators);
        for &pos in &acting {
            self.act_predator(pos, rng);
        }
        self.acting = acting;
    }

    fn act_predator<R: Rng + ?Sized>(&mut self, pos: Position, rng: &mut R) {
        let params = self.config.reproduction_params;
        let Some(mut energy) = self.grid.energy(pos) else {
            error!("Predator listed at ({}, {}) but the cell holds {:?}", pos.x, pos.y, self.grid.get(pos));
            return;
        };

        let neighbors = self.grid.neighbors(pos);
        let mut prey_cells = [pos; 8];
        let mut empty_cells = [pos; 8];
        let (mut n_prey, mut n_empty) = (0, 0);
        for &n in &neighbors {
            match self.grid.get(n) {
                CellState::Prey => {
                    prey_cells[n_prey] = n;
                    n_prey += 1;
                }
                CellState::Empty => {
                    empty_cells[n_empty] = n;
                    n_empty += 1;
                }
                CellState::Predator { .. } => {}
            }
        }

        let current = if let Some(&prey) = prey_cells[..n_prey].choose(rng) {
            self.pool.forget_prey(prey);
            self.pool.move_predator(&mut self.grid, pos, prey);
            energy += params.energy_gain_from_food;
            prey
        } else if let Some(&free) = empty_cells[..n_empty].choose(rng) {
            self.pool.move_predator(&mut self.grid, pos, free);
            energy -= params.move_cost;
            free
        } else {
            energy -= params.move_cost;
            pos
        };

        if self.config.reproduction_enabled {
            let draw: f64 = rng.random();
            if draw < params.predator_reproduce_prob && energy > 1 {
                let mut candidates = neighbors;
                candidates.shuffle(rng);
                if let Some(&birth) = candidates.iter().find(|&&n| self.grid.is_empty(n)) {
                    // Both halves get floor(energy / 2); an odd unit is lost.
                    energy /= 2;
                    if let Err(e) = self.pool.add_predator(&mut self.grid, birth, energy) {
                        error!("Predator birth failed: {}", e);
                    }
                }
            }
        }

        if energy <= 0 {
            self.pool.remove_predator(&mut self.grid, current);
        } else {
            self.grid.set_energy(current, energy);
        }
    }

    // --- Observation ---

    /// Current agents and counts for a renderer.
    pub fn snapshot(&self) -> Snapshot {
        let prey = self.pool.prey.iter().map(|p| AgentSnapshot {
            x: p.x,
            y: p.y,
            kind: AgentKind::Prey,
            energy: None,
        });
        let predators = self.pool.predators.iter().map(|p| AgentSnapshot {
            x: p.x,
            y: p.y,
            kind: AgentKind::Predator,
            energy: self.grid.energy(*p),
        });
        Snapshot {
            step: self.step_count,
            grid_size: self.grid.size(),
            prey_count: self.pool.prey_count(),
            predator_count: self.pool.predator_count(),
            agents: prey.chain(predators).collect(),
        }
    }
}
