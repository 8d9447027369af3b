use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Energy and reproduction parameters shared by every trial of a sweep.
///
/// The energy fields apply whether or not reproduction is enabled; the two
/// probabilities are only consulted when it is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReproductionParams {
    pub prey_reproduce_prob: f64,
    pub predator_reproduce_prob: f64,
    pub energy_gain_from_food: i32,
    pub initial_energy: i32,
    pub move_cost: i32,
}

impl ReproductionParams {
    /// Energy budget of the model without births: start at 5, +5 per prey, -1 per move.
    pub fn classic() -> Self {
        Self {
            prey_reproduce_prob: 0.04,
            predator_reproduce_prob: 0.05,
            energy_gain_from_food: 5,
            initial_energy: 5,
            move_cost: 1,
        }
    }

    /// Energy budget tuned for runs with reproduction enabled.
    pub fn breeding() -> Self {
        Self {
            prey_reproduce_prob: 0.04,
            predator_reproduce_prob: 0.05,
            energy_gain_from_food: 20,
            initial_energy: 10,
            move_cost: 1,
        }
    }
}

impl Default for ReproductionParams {
    fn default() -> Self {
        Self::classic()
    }
}

/// Immutable description of one trial. Derived once per sweep point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub grid_size: usize,
    pub max_steps: u32,
    pub initial_prey: usize,
    pub initial_predators: usize,
    pub reproduction_enabled: bool,
    pub reproduction_params: ReproductionParams,
}

impl TrialConfig {
    pub fn num_cells(&self) -> usize {
        self.grid_size * self.grid_size
    }

    /// Same configuration with different initial populations.
    pub fn with_counts(&self, initial_prey: usize, initial_predators: usize) -> Self {
        Self {
            initial_prey,
            initial_predators,
            ..*self
        }
    }

    /// Checks every precondition of initial placement and stepping.
    ///
    /// Zero prey or zero predators is allowed: such a trial terminates before
    /// its first step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size < 3 {
            return Err(ConfigError::GridTooSmall(self.grid_size));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroMaxSteps);
        }
        let cells = self.num_cells();
        if self.initial_prey + self.initial_predators > cells {
            return Err(ConfigError::CapacityExceeded {
                prey: self.initial_prey,
                predators: self.initial_predators,
                cells,
            });
        }

        let params = &self.reproduction_params;
        for (name, value) in [
            ("prey_reproduce_prob", params.prey_reproduce_prob),
            ("predator_reproduce_prob", params.predator_reproduce_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { name, value });
            }
        }
        if params.initial_energy <= 0 {
            return Err(ConfigError::NonPositiveInitialEnergy(params.initial_energy));
        }
        if params.move_cost < 0 {
            return Err(ConfigError::NegativeMoveCost(params.move_cost));
        }
        Ok(())
    }
}
