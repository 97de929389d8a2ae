//! CLI for uqsched: surrogates of scheduled task graphs under timing uncertainty.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "uqsched")]
#[command(about = "uqsched: surrogates of scheduled task graphs under timing uncertainty")]
#[command(version = uqsched_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the generated system, its uncertainty reduction, and the target's dimensions
    Inspect {
        /// JSON configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<String>,
    },

    /// Build a surrogate of the configured target and assess it at random points
    Solve {
        /// JSON configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<String>,

        /// Override the worker count (0 = one per hardware thread)
        #[arg(long)]
        workers: Option<usize>,

        /// Write a machine-readable report as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Monte Carlo evaluation of the target through the worker pool, no surrogate
    Sample {
        /// JSON configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<String>,

        /// Number of random nodes (defaults to assessment.samples)
        #[arg(long)]
        samples: Option<usize>,

        /// Random seed (defaults to assessment.seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Override the worker count (0 = one per hardware thread)
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { config } => commands::inspect::run(config.as_deref()),
        Commands::Solve {
            config,
            workers,
            output,
        } => commands::solve::run(config.as_deref(), workers, output.as_deref()),
        Commands::Sample {
            config,
            samples,
            seed,
            workers,
        } => commands::sample::run(commands::sample::SampleCommandConfig {
            config_path: config.as_deref(),
            samples,
            seed,
            workers,
        }),
    }
}
