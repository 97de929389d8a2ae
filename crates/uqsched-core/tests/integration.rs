//! Integration tests for uqsched-core.
//!
//! These tests run the full pipeline:
//! configuration → system and uncertainty model → solver → oracle → surrogate.

use std::io::Write;

use uqsched_core::{Config, Error, Grid, Oracle, Quantity, Solver, Target};

fn example_config(target: &str) -> Config {
    let mut config = Config::default();
    config.system.cores = 2;
    config.system.tasks = 20;
    config.system.seed = 0;
    config.uncertainty.correlation_length = 2.0;
    config.uncertainty.variance_threshold = 0.95;
    config.target.name = target.to_string();
    config.target.time_steps = 21;
    config.solver.workers = 4;
    config.interpolation.max_level = 2;
    config
}

/// Reduced dimension of the 2-core, 20-task example with seed 0.
const EXAMPLE_NZ: usize = 10;

#[test]
fn end_to_end_delay_at_midpoint_is_deterministic() {
    let config = example_config("end-to-end-delay");
    // Lattice numerator of 0.5 on the finest level.
    let midpoint = 1u64 << (config.interpolation.max_level - 1);
    let spans: Vec<f64> = (0..3)
        .map(|_| {
            let target = Target::from_config(&config).unwrap();
            let nz = target.dimensions().inputs;
            assert_eq!(nz, EXAMPLE_NZ);
            let mut solver = Solver::new(target, &config.solver).unwrap();
            let values = solver.batch(&vec![0.5; nz], &vec![midpoint; nz]).unwrap();
            assert_eq!(values.len(), 1);
            values[0]
        })
        .collect();
    assert!(spans[0] > 0.0);
    assert_eq!(spans[0], spans[1]);
    assert_eq!(spans[1], spans[2]);
}

#[test]
fn midpoint_delay_exceeds_nominal_span() {
    let config = example_config("end-to-end-delay");
    let target = Target::from_config(&config).unwrap();
    let nominal = target.model().system.schedule.span();
    let nz = target.dimensions().inputs;
    let mut solver = Solver::new(target, &config.solver).unwrap();
    let span = solver.batch(&vec![0.5; nz], &[]).unwrap()[0];
    assert!(span > nominal, "{span} vs nominal {nominal}");
}

#[test]
fn direct_and_cached_agree_on_energy() {
    let mut config = example_config("total-energy");
    // Strong correlation keeps the reduced dimension, and the grid, small.
    config.uncertainty.correlation_length = 100.0;
    let direct_target = Target::from_config(&config).unwrap();
    let mut direct = Solver::new(direct_target, &config.solver).unwrap();
    config.solver.force_cache = true;
    let cached_target = Target::from_config(&config).unwrap();
    let mut cached = Solver::new(cached_target, &config.solver).unwrap();
    assert_eq!((direct.strategy(), cached.strategy()), ("direct", "cached"));

    let oracle = Grid::from_config(&config.interpolation).unwrap();
    let a = direct.compute(&oracle).unwrap();
    let b = cached.compute(&oracle).unwrap();
    assert_eq!(direct.stats().nodes, cached.stats().nodes);

    let nz = direct.quantity().dimensions().inputs;
    let points: Vec<f64> = (0..10 * nz).map(|i| (i % 7) as f64 / 6.0).collect();
    let x = oracle.evaluate(&a, &points);
    let y = oracle.evaluate(&b, &points);
    assert!(x.iter().zip(&y).all(|(p, q)| p.to_bits() == q.to_bits()));
}

#[test]
fn temperature_profile_reuses_slow_points() {
    let mut config = example_config("temperature-profile");
    config.system.tasks = 8;
    config.uncertainty.correlation_length = 100.0;
    config.uncertainty.variance_threshold = 0.5;
    config.interpolation.min_level = 2;
    config.interpolation.max_level = 2;

    let target = Target::from_config(&config).unwrap();
    let dims = target.dimensions();
    assert_eq!((dims.fast, dims.outputs), (1, 2));
    let mut solver = Solver::new(target, &config.solver).unwrap();
    assert_eq!(solver.strategy(), "cached");

    let oracle = Grid::from_config(&config.interpolation).unwrap();
    let surface = solver.compute(&oracle).unwrap();
    let stats = solver.stats();
    // Five slow positions per slow dimension at level 2, five fast variants each.
    let slow_points = 5u64.pow(dims.slow() as u32);
    assert_eq!(stats.evaluations, slow_points);
    assert_eq!(stats.nodes, 5 * slow_points);

    // The profile starts at the ambient temperature on every core.
    let mut start = vec![0.0; dims.inputs];
    start[1..].fill(0.5);
    let values = oracle.evaluate(&surface, &start);
    for t in values {
        assert!((t - 318.15).abs() < 1e-6);
    }
}

#[test]
fn config_file_drives_the_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "system": {{ "cores": 2, "tasks": 6, "seed": 3 }},
            "target": {{ "name": "peak-temperature" }},
            "solver": {{ "workers": 2 }},
            "interpolation": {{ "min_level": 1, "max_level": 1 }}
        }}"#
    )
    .unwrap();

    let config = Config::from_path(file.path()).unwrap();
    let target = Target::from_config(&config).unwrap();
    let mut solver = Solver::new(target, &config.solver).unwrap();
    let surface = solver.compute(&Grid::from_config(&config.interpolation).unwrap()).unwrap();
    assert_eq!(surface.outputs(), 2);
    assert_eq!(solver.stats().batches, 2);
}

#[test]
fn default_configuration_solves_within_the_node_budget() {
    let mut config = Config::default();
    config.solver.workers = 4;
    let target = Target::from_config(&config).unwrap();
    let nz = target.dimensions().inputs;
    assert_eq!(nz, EXAMPLE_NZ);

    let oracle = Grid::from_config(&config.interpolation).unwrap();
    let mut solver = Solver::new(target, &config.solver).unwrap();
    let surface = solver.compute(&oracle).unwrap();
    assert_eq!(surface.level(), 1);
    assert_eq!(surface.nodes(), 3usize.pow(nz as u32));
    assert!(surface.nodes() <= config.interpolation.max_nodes);
    assert_eq!(solver.stats().nodes, 3u64.pow(nz as u32));
}

#[test]
fn oversized_grid_is_a_configuration_error() {
    let mut config = example_config("end-to-end-delay");
    // Accepted by validation, but too many dimensions for a full tensor grid.
    config.interpolation.max_level = 4;
    config.validate().unwrap();
    let target = Target::from_config(&config).unwrap();
    let oracle = Grid::from_config(&config.interpolation).unwrap();
    let mut solver = Solver::new(target, &config.solver).unwrap();
    let err = solver.compute(&oracle).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
    assert_eq!(solver.stats().batches, 0);

    // Far more dimensions than a node count can address.
    let mut config = example_config("end-to-end-delay");
    config.system.tasks = 100;
    // Practically uncorrelated tasks: one dimension per task up to 90%.
    config.uncertainty.correlation_length = 0.1;
    config.uncertainty.variance_threshold = 0.9;
    let target = Target::from_config(&config).unwrap();
    assert!(target.dimensions().inputs > 41);
    let oracle = Grid::from_config(&config.interpolation).unwrap();
    let mut solver = Solver::new(target, &config.solver).unwrap();
    assert!(matches!(solver.compute(&oracle), Err(Error::Config(_))));
}

#[test]
fn unknown_target_is_a_configuration_error() {
    let err = Config::from_json(r#"{ "target": { "name": "throughput" } }"#).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
