use predator_prey_common::{Outcome, SweepConfig, SweepMode};
use predator_prey_engine::{KernelExecutor, PhaseMatrix, SweepDriver, WorkerPoolExecutor};

const RATIO_DENSITY: &str = r#"
    [grid]
    size = 10
    max_steps = 150

    [reproduction]
    enabled = true

    [predators]
    initial_energy = 10
    energy_gain_from_food = 20

    [sweep]
    mode = "ratio_density"
    x = [0.5, 2.0, 8.0]
    y = [0.0, 0.1, 0.4]
    num_simulations = 6
    base_seed = 11

    [output]
    base_filename = "pipeline"
"#;

fn run(config: &SweepConfig) -> PhaseMatrix {
    let plan = SweepDriver::from_config(config).plan();
    plan.run(&WorkerPoolExecutor::new(2)).unwrap()
}

#[test]
fn ratio_density_sweep_fills_every_valid_point() {
    let config = SweepConfig::from_toml_str(RATIO_DENSITY).unwrap();
    let matrix = run(&config);

    assert_eq!((matrix.rows(), matrix.cols()), (3, 3));
    assert_eq!(matrix.x_values, vec![0.5, 2.0, 8.0]);
    assert_eq!(matrix.y_values, vec![0.0, 0.1, 0.4]);

    // Density 0 is never simulated.
    assert!(matrix.row(0).iter().all(Option::is_none));
    assert_eq!(matrix.counts(0, 1), [0, 0, 0]);

    for row in 1..3 {
        for col in 0..3 {
            let counts = matrix.counts(row, col);
            assert_eq!(counts.iter().sum::<usize>(), 6, "point ({}, {})", row, col);
            let majority = matrix.get(row, col).expect("simulated point has a majority");
            let best = counts.iter().copied().max().unwrap();
            assert_eq!(counts[majority.code() as usize], best);
        }
    }
    assert_eq!(matrix.histogram().iter().sum::<usize>(), 6);
}

#[test]
fn sweep_is_reproducible_and_executor_independent() {
    let config = SweepConfig::from_toml_str(RATIO_DENSITY).unwrap();
    let plan = SweepDriver::from_config(&config).plan();

    let pooled = plan.run(&WorkerPoolExecutor::new(3)).unwrap();
    let single = plan.run(&WorkerPoolExecutor::new(1)).unwrap();
    let kernel = plan.run(&KernelExecutor::new(4, 16, 2)).unwrap();
    assert_eq!(pooled, single);
    assert_eq!(pooled, kernel);

    let again = run(&SweepConfig::from_toml_str(RATIO_DENSITY).unwrap());
    assert_eq!(pooled, again);
}

#[test]
fn different_base_seed_still_covers_the_same_points() {
    let config = SweepConfig::from_toml_str(RATIO_DENSITY).unwrap();
    let mut reseeded = config.clone();
    reseeded.sweep.base_seed = 12345;

    let a = run(&config);
    let b = run(&reseeded);
    for row in 0..a.rows() {
        for col in 0..a.cols() {
            assert_eq!(a.get(row, col).is_some(), b.get(row, col).is_some());
        }
    }
}

#[test]
fn counts_sweep_with_an_overfull_point() {
    let toml = r#"
        [grid]
        size = 6
        max_steps = 40

        [sweep]
        mode = "counts"
        x = [0.0, 5.0, 30.0]
        y = [3.0, 10.0]
        num_simulations = 4

        [executor]
        kind = "kernel"
        lanes_per_block = 3
        max_grid_dim = 8

        [output]
        base_filename = "counts"
    "#;
    let config = SweepConfig::from_toml_str(toml).unwrap();
    let plan = SweepDriver::from_config(&config).plan();
    assert_eq!(plan.mode, SweepMode::Counts);
    // 30 prey + 10 predators does not fit on 36 cells.
    assert_eq!(plan.valid_points(), 5);

    let matrix = plan.run(&KernelExecutor::new(3, 8, 1)).unwrap();
    assert_eq!(matrix.x_label, "Initial Prey Population");

    // No prey at all: every trial ends with the prey gone.
    assert_eq!(matrix.get(0, 0), Some(Outcome::PreyExtinct));
    assert_eq!(matrix.counts(0, 0), [4, 0, 0]);
    assert_eq!(matrix.get(1, 0), Some(Outcome::PreyExtinct));

    assert_eq!(matrix.get(1, 2), None);
    assert!(matrix.get(0, 2).is_some());
}

#[test]
fn phase_matrix_survives_binary_export() {
    let matrix = run(&SweepConfig::from_toml_str(RATIO_DENSITY).unwrap());
    let bytes = bincode::serialize(&matrix).unwrap();
    let decoded: PhaseMatrix = bincode::deserialize(&bytes).unwrap();
    assert_eq!(decoded, matrix);
}
