use crate::simulation::{run_trial, Simulation, TrialReport};
use crate::sweep::TrialSpec;
use anyhow::Result;
use log::{error, info};
use predator_prey_common::{ConfigError, ExecutorConfig, ExecutorKind};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome of one trial, tagged with where it belongs.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    pub index: usize,
    pub point: usize,
    pub report: Result<TrialReport, ConfigError>,
}

/// Runs a batch of independent trials, returning one result per trial in input order.
pub trait TrialExecutor: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(&self, trials: &[TrialSpec]) -> Result<Vec<TrialResult>>;
}

/// Builds the executor selected in the configuration.
pub fn from_config(config: &ExecutorConfig) -> Box<dyn TrialExecutor> {
    match config.kind {
        ExecutorKind::WorkerPool => Box::new(WorkerPoolExecutor::new(config.threads)),
        ExecutorKind::Kernel => Box::new(KernelExecutor::new(
            config.lanes_per_block,
            config.max_grid_dim,
            config.threads,
        )),
    }
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    // 0 lets rayon pick the number of threads.
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    Ok(pool)
}

/// Logs completion every ~10% of a batch.
struct Progress {
    done: AtomicUsize,
    total: usize,
    every: usize,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            every: (total / 10).max(1),
        }
    }

    fn tick(&self, n: usize) {
        let before = self.done.fetch_add(n, Ordering::Relaxed);
        let after = before + n;
        if after / self.every != before / self.every || after == self.total {
            info!("Trials [{}/{}]", after.min(self.total), self.total);
        }
    }
}

/// Distributes whole trials over a rayon worker pool. Each trial builds its own
/// world and seeds its own generator from the trial seed.
#[derive(Debug, Clone)]
pub struct WorkerPoolExecutor {
    threads: usize,
}

impl WorkerPoolExecutor {
    pub fn new(threads: usize) -> Self {
        Self { threads }
    }
}

impl TrialExecutor for WorkerPoolExecutor {
    fn name(&self) -> &'static str {
        "worker-pool"
    }

    fn execute(&self, trials: &[TrialSpec]) -> Result<Vec<TrialResult>> {
        let pool = build_pool(self.threads)?;
        info!("Using {} worker threads.", pool.current_num_threads());
        let progress = Progress::new(trials.len());

        let results = pool.install(|| {
            trials
                .par_iter()
                .map(|spec| {
                    let mut rng = StdRng::seed_from_u64(spec.seed);
                    let report = run_trial(&spec.config, &mut rng);
                    progress.tick(1);
                    TrialResult {
                        index: spec.index,
                        point: spec.point,
                        report,
                    }
                })
                .collect()
        });
        Ok(results)
    }
}

/// Data-parallel execution modelled on a device kernel: trials are cut into
/// blocks of `lanes_per_block` lanes, every block owns one fixed-capacity
/// workspace that its lanes reuse, and each lane writes its result into a
/// pre-sized output buffer at its trial index.
#[derive(Debug, Clone)]
pub struct KernelExecutor {
    lanes_per_block: usize,
    max_grid_dim: usize,
    threads: usize,
}

impl KernelExecutor {
    pub fn new(lanes_per_block: usize, max_grid_dim: usize, threads: usize) -> Self {
        Self {
            lanes_per_block: lanes_per_block.max(1),
            max_grid_dim,
            threads,
        }
    }

    /// Runs one lane in the block workspace. Grids larger than the workspace are refused.
    fn run_lane(&self, workspace: &mut Option<Simulation>, spec: &TrialSpec) -> Result<TrialReport, ConfigError> {
        if spec.config.grid_size > self.max_grid_dim {
            return Err(ConfigError::ExceedsKernelCapacity {
                size: spec.config.grid_size,
                max: self.max_grid_dim,
            });
        }
        let mut rng = StdRng::seed_from_u64(spec.seed);
        let mut sim = match workspace.take() {
            Some(mut sim) => {
                sim.reset(&spec.config, &mut rng)?;
                sim
            }
            None => Simulation::with_capacity(&spec.config, self.max_grid_dim, &mut rng)?,
        };
        let report = sim.run_to_end(&mut rng);
        *workspace = Some(sim);
        Ok(report)
    }
}

impl TrialExecutor for KernelExecutor {
    fn name(&self) -> &'static str {
        "kernel"
    }

    fn execute(&self, trials: &[TrialSpec]) -> Result<Vec<TrialResult>> {
        let pool = build_pool(self.threads)?;
        let blocks = trials.len().div_ceil(self.lanes_per_block);
        info!(
            "Launching {} blocks of {} lanes (workspace {}x{}).",
            blocks, self.lanes_per_block, self.max_grid_dim, self.max_grid_dim
        );
        let progress = Progress::new(trials.len());

        let mut output: Vec<Option<Result<TrialReport, ConfigError>>> = vec![None; trials.len()];
        pool.install(|| {
            output
                .par_chunks_mut(self.lanes_per_block)
                .zip(trials.par_chunks(self.lanes_per_block))
                .for_each(|(slots, lanes)| {
                    let mut workspace: Option<Simulation> = None;
                    for (slot, spec) in slots.iter_mut().zip(lanes) {
                        *slot = Some(self.run_lane(&mut workspace, spec));
                    }
                    progress.tick(lanes.len());
                });
        });

        trials
            .iter()
            .zip(output)
            .map(|(spec, slot)| match slot {
                Some(report) => Ok(TrialResult {
                    index: spec.index,
                    point: spec.point,
                    report,
                }),
                None => {
                    error!("Lane for trial {} never wrote its result.", spec.index);
                    anyhow::bail!("Kernel output buffer incomplete at trial {}.", spec.index)
                }
            })
            .collect()
    }
}
