use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uqsched_core::{Grid, Oracle, Quantity, Solver};

use super::{OutputSummary, load_config, make_target, print_summary, summarize};

pub fn run(config_path: Option<&str>, workers: Option<usize>, output_path: Option<&str>) {
    let mut config = load_config(config_path);
    if let Some(workers) = workers {
        config.solver.workers = workers;
    }
    let target = make_target(&config);
    let kind = target.kind();
    let dims = target.dimensions();

    let oracle = match Grid::from_config(&config.interpolation) {
        Ok(oracle) => oracle,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let mut solver = match Solver::new(target, &config.solver) {
        Ok(solver) => solver,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!(
        "Solving {kind} ({} inputs, {} outputs) with the {} strategy on {} workers...",
        dims.inputs,
        dims.outputs,
        solver.strategy(),
        config.solver.worker_count()
    );
    let t0 = Instant::now();
    let surface = match solver.compute(&oracle) {
        Ok(surface) => surface,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = t0.elapsed();
    let stats = solver.stats();

    println!();
    println!("  Level:         {}", surface.level());
    println!("  Batches:       {}", stats.batches);
    println!("  Nodes:         {}", stats.nodes);
    println!("  Evaluations:   {}", stats.evaluations);
    if solver.strategy() == "cached" {
        println!("  Cache hits:    {}", stats.cache_hits);
        println!("  Cache misses:  {}", stats.cache_misses);
    }
    println!("  Time:          {:.3}s", elapsed.as_secs_f64());

    let samples = config.assessment.samples;
    let mut rng = StdRng::seed_from_u64(config.assessment.seed);
    let points: Vec<f64> = (0..samples * dims.inputs)
        .map(|_| rng.random::<f64>())
        .collect();
    let values = solver.evaluate(&oracle, &surface, &points);
    let summary: Vec<OutputSummary> = summarize(&values, dims.outputs);

    println!();
    println!("Assessment at {samples} random points:");
    print_summary(&summary);

    if let Some(path) = output_path {
        let report = serde_json::json!({
            "version": uqsched_core::VERSION,
            "target": kind.name(),
            "strategy": solver.strategy(),
            "workers": config.solver.worker_count(),
            "dimensions": {
                "inputs": dims.inputs,
                "fast": dims.fast,
                "outputs": dims.outputs,
            },
            "level": surface.level(),
            "surface_nodes": surface.nodes(),
            "elapsed_secs": elapsed.as_secs_f64(),
            "stats": stats,
            "assessment": {
                "samples": samples,
                "seed": config.assessment.seed,
                "outputs": summary,
            },
            "config": config,
        });
        let json = match serde_json::to_string_pretty(&report) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Failed to serialize report: {e}");
                std::process::exit(1);
            }
        };
        match std::fs::write(path, json) {
            Ok(()) => println!("\nReport written to {path}"),
            Err(e) => eprintln!("\nFailed to write {path}: {e}"),
        }
    }
}
