pub mod inspect;
pub mod sample;
pub mod solve;

use serde::Serialize;
use statrs::statistics::Statistics;
use uqsched_core::{Config, Target};

/// Load the configuration at `path`, or the defaults. Exits on error.
pub fn load_config(path: Option<&str>) -> Config {
    let loaded = match path {
        Some(path) => Config::from_path(std::path::Path::new(path)),
        None => Config::default().validate().map(|_| Config::default()),
    };
    match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Build the configured target. Exits on error.
pub fn make_target(config: &Config) -> Target {
    match Target::from_config(config) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Mean and sample standard deviation of one output.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutputSummary {
    pub mean: f64,
    pub std_dev: f64,
}

/// Summarize row-major `values` with `outputs` columns.
pub fn summarize(values: &[f64], outputs: usize) -> Vec<OutputSummary> {
    (0..outputs)
        .map(|o| {
            let column: Vec<f64> = values.iter().skip(o).step_by(outputs).copied().collect();
            OutputSummary {
                mean: column.iter().mean(),
                std_dev: column.iter().std_dev(),
            }
        })
        .collect()
}

pub fn print_summary(summary: &[OutputSummary]) {
    println!("  {:>6} {:>14} {:>14}", "Output", "Mean", "Std dev");
    println!("  {}", "-".repeat(36));
    for (o, s) in summary.iter().enumerate() {
        println!("  {:>6} {:>14.6} {:>14.6}", o, s.mean, s.std_dev);
    }
}
