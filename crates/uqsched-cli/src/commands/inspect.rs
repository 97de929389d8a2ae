use uqsched_core::{Quantity, strategy_for};

use super::{load_config, make_target};

pub fn run(config_path: Option<&str>) {
    let config = load_config(config_path);
    let target = make_target(&config);
    let model = target.model();
    let system = &model.system;
    let transform = &model.transform;
    let reduction = transform.reduction();

    println!("System");
    println!("  Tasks:         {}", system.tasks());
    println!("  Cores:         {}", system.cores());
    println!("  Nominal span:  {:.6} s", system.schedule.span());
    println!("  Time step:     {:.3e} s", system.time_step());
    println!();

    println!("Uncertainty");
    println!("  Distribution:  {}", config.uncertainty.distribution);
    println!("  Deviation:     {:.1}% of nominal", 100.0 * config.uncertainty.deviation);
    println!("  Uncertain:     {} tasks (nu)", transform.uncertain());
    println!("  Reduced:       {} dimensions (nz)", transform.dimension());
    println!("  Retained:      {:.2}% of variance", 100.0 * reduction.retained);
    println!();

    let dims = target.dimensions();
    println!("Target: {}", target.kind());
    println!("  Inputs:        {} ({} fast, {} slow)", dims.inputs, dims.fast, dims.slow());
    println!("  Outputs:       {}", dims.outputs);
    println!("  Strategy:      {}", strategy_for(dims, &config.solver));
}
