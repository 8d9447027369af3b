//! Expansion of a 2-D parameter grid into independent, seeded trials.
//!
//! Points are enumerated with the x axis outer and the y axis inner; the phase
//! matrix stores them at `(row = y index, col = x index)`.

use crate::aggregate::{OutcomeAggregator, PhaseMatrix};
use crate::executor::TrialExecutor;
use anyhow::Result;
use log::{debug, info, warn};
use predator_prey_common::{ConfigError, SweepConfig, SweepMode, TrialConfig};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Odd 64-bit constant separating consecutive trial seeds.
pub const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed of the random stream owned by trial `trial_index`.
pub fn trial_seed(base_seed: u64, trial_index: usize) -> u64 {
    base_seed.wrapping_add((trial_index as u64).wrapping_mul(SEED_STRIDE))
}

/// A coordinate in parameter space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub row: usize,
    pub col: usize,
    pub x: f64,
    pub y: f64,
}

/// A sweep point and the trial configuration derived from it, or the reason it is skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPoint {
    pub point: SweepPoint,
    pub config: Result<TrialConfig, ConfigError>,
}

/// One independent trial: a shared configuration plus its own seed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialSpec {
    /// Global trial index; also the seed derivation index.
    pub index: usize,
    /// Index into [`SweepPlan::points`].
    pub point: usize,
    pub seed: u64,
    pub config: TrialConfig,
}

#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub mode: SweepMode,
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    pub points: Vec<PlannedPoint>,
    pub trials: Vec<TrialSpec>,
}

/// Prey and predator counts for a `(ratio, density)` pair on a grid of `num_cells` cells.
///
/// `N = round(density * cells)` with a floor of 2, split by `ratio / (ratio + 1)`,
/// then clamped so both species get at least one agent. A zero density is
/// not simulated.
pub fn counts_from_ratio_density(ratio: f64, density: f64, num_cells: usize) -> Result<(usize, usize), ConfigError> {
    if density == 0.0 {
        return Err(ConfigError::InvalidSweepPoint("density is zero".into()));
    }
    if !density.is_finite() || !(0.0..=1.0).contains(&density) {
        return Err(ConfigError::InvalidSweepPoint(format!("density {} is outside [0, 1]", density)));
    }
    if !ratio.is_finite() || ratio < 0.0 {
        return Err(ConfigError::InvalidSweepPoint(format!("ratio {} is negative", ratio)));
    }

    let total = ((density * num_cells as f64).round() as usize).max(2);
    let mut prey = ((ratio / (ratio + 1.0)) * total as f64).round() as usize;
    let mut predators = total - prey;
    if prey == 0 {
        prey = 1;
        predators = total - 1;
    }
    if predators == 0 {
        predators = 1;
        prey = total - 1;
    }
    Ok((prey, predators))
}

fn count_from_axis(value: f64, axis: &str) -> Result<usize, ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidSweepPoint(format!("{} count {} is negative", axis, value)));
    }
    Ok(value.round() as usize)
}

/// Builds the trial list for a sweep.
#[derive(Debug, Clone)]
pub struct SweepDriver {
    pub template: TrialConfig,
    pub mode: SweepMode,
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    pub num_simulations: usize,
    pub base_seed: u64,
}

impl SweepDriver {
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            template: config.trial_template(),
            mode: config.sweep.mode,
            x_values: config.sweep.x.values(),
            y_values: config.sweep.y.values(),
            num_simulations: config.sweep.num_simulations,
            base_seed: config.sweep.base_seed,
        }
    }

    /// Derives the trial configuration of one coordinate.
    pub fn derive(&self, x: f64, y: f64) -> Result<TrialConfig, ConfigError> {
        let (prey, predators) = match self.mode {
            SweepMode::RatioDensity => counts_from_ratio_density(x, y, self.template.num_cells())?,
            SweepMode::Counts => (count_from_axis(x, "prey")?, count_from_axis(y, "predator")?),
        };
        let config = self.template.with_counts(prey, predators);
        config.validate()?;
        Ok(config)
    }

    /// Cartesian product of the axes, each valid point replicated `num_simulations` times.
    pub fn plan(&self) -> SweepPlan {
        let mut points = Vec::with_capacity(self.x_values.len() * self.y_values.len());
        let mut trials = Vec::new();

        for (col, &x) in self.x_values.iter().enumerate() {
            for (row, &y) in self.y_values.iter().enumerate() {
                let point = SweepPoint { row, col, x, y };
                let config = self.derive(x, y);
                match &config {
                    Ok(cfg) => {
                        debug!(
                            "Point ({:.3}, {:.3}) -> {} prey, {} predators",
                            x, y, cfg.initial_prey, cfg.initial_predators
                        );
                        let point_idx = points.len();
                        for _ in 0..self.num_simulations {
                            let index = trials.len();
                            trials.push(TrialSpec {
                                index,
                                point: point_idx,
                                seed: trial_seed(self.base_seed, index),
                                config: *cfg,
                            });
                        }
                    }
                    Err(ConfigError::InvalidSweepPoint(reason)) => {
                        debug!("Skipping point ({:.3}, {:.3}): {}", x, y, reason);
                    }
                    Err(e) => warn!("Skipping point ({:.3}, {:.3}): {}", x, y, e),
                }
                points.push(PlannedPoint { point, config });
            }
        }

        SweepPlan {
            mode: self.mode,
            x_values: self.x_values.clone(),
            y_values: self.y_values.clone(),
            points,
            trials,
        }
    }
}

impl SweepPlan {
    pub fn valid_points(&self) -> usize {
        self.points.iter().filter(|p| p.config.is_ok()).count()
    }

    /// Runs every trial on `executor` and reduces the outcomes into a phase matrix.
    pub fn run(&self, executor: &dyn TrialExecutor) -> Result<PhaseMatrix> {
        info!(
            "Running {} trials over {} points ({} skipped) with the {} executor...",
            self.trials.len(),
            self.points.len(),
            self.points.len() - self.valid_points(),
            executor.name()
        );
        let start_time = Instant::now();
        let results = executor.execute(&self.trials)?;
        info!("Trials finished in {:.3} seconds.", start_time.elapsed().as_secs_f64());

        let mut aggregator = OutcomeAggregator::new(self.points.len());
        for result in &results {
            aggregator.record_result(result);
        }
        Ok(aggregator.into_matrix(self))
    }
}
