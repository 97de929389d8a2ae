use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uqsched_core::{Direct, Quantity};

use super::{load_config, make_target, print_summary, summarize};

pub struct SampleCommandConfig<'a> {
    pub config_path: Option<&'a str>,
    pub samples: Option<usize>,
    pub seed: Option<u64>,
    pub workers: Option<usize>,
}

pub fn run(cmd: SampleCommandConfig<'_>) {
    let mut config = load_config(cmd.config_path);
    if let Some(workers) = cmd.workers {
        config.solver.workers = workers;
    }
    let samples = cmd.samples.unwrap_or(config.assessment.samples);
    let seed = cmd.seed.unwrap_or(config.assessment.seed);
    if samples == 0 {
        eprintln!("Error: --samples must be at least 1");
        std::process::exit(1);
    }

    let target = make_target(&config);
    let kind = target.kind();
    let dims = target.dimensions();
    let workers = config.solver.worker_count();
    let mut direct = match Direct::new(Arc::new(target), workers) {
        Ok(direct) => direct,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let nodes: Vec<f64> = (0..samples * dims.inputs)
        .map(|_| rng.random::<f64>())
        .collect();

    println!("Sampling {kind} at {samples} random nodes on {workers} workers (seed {seed})...");
    let t0 = Instant::now();
    let values = match direct.batch(&nodes) {
        Ok(values) => values,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    println!("  Time: {:.3}s", t0.elapsed().as_secs_f64());
    println!();
    print_summary(&summarize(&values, dims.outputs));
}
