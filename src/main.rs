use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, error, info, trace};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use predator_prey_common::{ExecutorKind, OutputConfig, SweepConfig};
use predator_prey_engine::executor;
use predator_prey_engine::simulation::Simulation;
use predator_prey_engine::sweep::SweepDriver;
use predator_prey_engine::PhaseMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Command-line arguments for the predator-prey engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config.toml file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full parameter sweep and write the phase matrix (default)
    Sweep {
        /// Override the executor from the config
        #[arg(long, value_enum)]
        executor: Option<ExecutorArg>,

        /// Override the number of worker threads (0 = all cores)
        #[arg(long)]
        threads: Option<usize>,

        /// Override the base seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run a single seeded trial and log its population counts
    Trial {
        #[arg(long)]
        prey: usize,

        #[arg(long)]
        predators: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Log populations every N steps
        #[arg(long, default_value_t = 50)]
        report_every: u32,

        /// Print the final grid snapshot as JSON
        #[arg(long)]
        snapshot: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExecutorArg {
    WorkerPool,
    Kernel,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    let args = Args::parse();
    info!("Starting Predator-Prey Engine...");

    // --- Load Configuration ---
    let mut config = SweepConfig::load(&args.config)?;
    debug!("Configuration: {:#?}", config);

    match args.command.unwrap_or(Command::Sweep { executor: None, threads: None, seed: None }) {
        Command::Sweep { executor, threads, seed } => {
            if let Some(kind) = executor {
                config.executor.kind = match kind {
                    ExecutorArg::WorkerPool => ExecutorKind::WorkerPool,
                    ExecutorArg::Kernel => ExecutorKind::Kernel,
                };
            }
            if let Some(threads) = threads {
                config.executor.threads = threads;
            }
            if let Some(seed) = seed {
                config.sweep.base_seed = seed;
            }
            run_sweep(&config)
        }
        Command::Trial { prey, predators, seed, report_every, snapshot } => {
            run_single_trial(&config, prey, predators, seed, report_every, snapshot)
        }
    }
}

fn run_sweep(config: &SweepConfig) -> Result<()> {
    let driver = SweepDriver::from_config(config);
    let plan = driver.plan();
    info!(
        "Sweep over {} x {} points, {} simulations each (grid {}x{}, max {} steps, reproduction {}).",
        plan.x_values.len(),
        plan.y_values.len(),
        config.sweep.num_simulations,
        config.grid.size,
        config.grid.size,
        config.grid.max_steps,
        if config.reproduction.enabled { "on" } else { "off" }
    );

    let executor = executor::from_config(&config.executor);
    let matrix = plan.run(executor.as_ref())?;

    let [prey_extinct, predator_extinct, coexistence] = matrix.histogram();
    info!(
        "Phase matrix: {} points prey extinct, {} predator extinct, {} coexistence.",
        prey_extinct, predator_extinct, coexistence
    );

    if config.output.save_matrix {
        write_phase_matrix(&matrix, &config.output)?;
    } else {
        info!("Skipping saving the phase matrix as per config (save_matrix is false).");
    }
    info!("Sweep Complete.");
    Ok(())
}

fn run_single_trial(
    config: &SweepConfig,
    prey: usize,
    predators: usize,
    seed: u64,
    report_every: u32,
    print_snapshot: bool,
) -> Result<()> {
    let trial_config = config.trial_template().with_counts(prey, predators);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sim = Simulation::new(&trial_config, &mut rng)
        .with_context(|| format!("Cannot start a trial with {} prey and {} predators", prey, predators))?;
    sim.enable_history();
    info!("Trial initialised with {} prey and {} predators (seed {}).", prey, predators, seed);

    let report_every = report_every.max(1);
    let start_time = Instant::now();
    let outcome = loop {
        if let Some(outcome) = sim.outcome() {
            break outcome;
        }
        sim.step(&mut rng);
        let step = sim.step_count();
        if step % report_every == 0 {
            info!(
                "Step [{}/{}] | Prey: {} | Predators: {}",
                step,
                trial_config.max_steps,
                sim.pool().prey_count(),
                sim.pool().predator_count()
            );
        } else {
            trace!("Step {} completed", step);
        }
    };

    info!(
        "Trial finished after {} steps in {:.3} ms: {} ({} prey, {} predators left).",
        sim.step_count(),
        start_time.elapsed().as_secs_f64() * 1000.0,
        outcome,
        sim.pool().prey_count(),
        sim.pool().predator_count()
    );
    debug!("Population history: {:?}", sim.history());
    println!("{}", outcome);

    if print_snapshot {
        println!("{}", serde_json::to_string(&sim.snapshot())?);
    }
    Ok(())
}

/// Hands the phase matrix to the plotting side in the configured format.
fn write_phase_matrix(matrix: &PhaseMatrix, output: &OutputConfig) -> Result<()> {
    let output_format = output.format.as_deref().unwrap_or("json");

    match output_format {
        "json" => {
            let filename = format!("{}_phase.json", output.base_filename);
            let mut file = File::create(&filename)
                .with_context(|| format!("Error creating phase matrix file '{}'", filename))?;
            let json_string = serde_json::to_string(matrix)?;
            file.write_all(json_string.as_bytes())
                .with_context(|| format!("Error writing phase matrix JSON to '{}'", filename))?;
            info!("Phase matrix saved to {}", filename);
        }
        "csv" => {
            let filename = format!("{}_phase.csv", output.base_filename);
            let mut writer = csv::Writer::from_path(&filename)
                .with_context(|| format!("Error creating CSV file '{}'", filename))?;
            let mut header = vec![format!("{} \\ {}", matrix.y_label, matrix.x_label)];
            header.extend(matrix.x_values.iter().map(|x| format!("{:.4}", x)));
            writer.write_record(&header)?;
            for row in 0..matrix.rows() {
                let mut record = vec![format!("{:.4}", matrix.y_values[row])];
                record.extend(matrix.row(row).iter().map(|cell| match cell {
                    Some(outcome) => outcome.code().to_string(),
                    None => "nan".to_string(),
                }));
                writer.write_record(&record)?;
            }
            writer.flush()?;
            info!("Phase matrix saved to {}", filename);
        }
        "bincode" => {
            // Binary format (much more compact)
            let filename = format!("{}_phase.bin", output.base_filename);
            let file = File::create(&filename)
                .with_context(|| format!("Error creating phase matrix file '{}'", filename))?;
            bincode::serialize_into(file, matrix)?;
            info!("Phase matrix saved to {} (binary format)", filename);
        }
        "messagepack" => {
            let filename = format!("{}_phase.msgpack", output.base_filename);
            let mut file = File::create(&filename)
                .with_context(|| format!("Error creating phase matrix file '{}'", filename))?;
            rmp_serde::encode::write(&mut file, matrix)?;
            info!("Phase matrix saved to {} (MessagePack format)", filename);
        }
        other => {
            error!("Unknown output format: {}. Using JSON instead.", other);
            let fallback = OutputConfig {
                format: Some("json".to_string()),
                ..output.clone()
            };
            return write_phase_matrix(matrix, &fallback);
        }
    }
    Ok(())
}
