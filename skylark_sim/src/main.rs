// skylark_sim/src/main.rs

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skylark_sim::cli::Cli;
use skylark_sim::error::SimError;
use skylark_sim::run_scenario;
use skylark_sim::scenario::load_scenario;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), SimError> {
    info!("Loading scenario from: {}", cli.scenario.display());
    let mut scenario = load_scenario(&cli.scenario)?;

    // --- Command-line overrides ---
    if let Some(duration) = cli.duration {
        scenario.simulation.duration_seconds = duration;
    }
    if cli.seed.is_some() {
        scenario.simulation.seed = cli.seed;
    }
    if let Some(interval) = cli.report_interval {
        scenario.simulation.report_interval_seconds = interval;
    }

    let summary = run_scenario(&scenario)?;

    match summary.init_time_s {
        Some(t) => info!("Navigation initialised at t = {:.2} s", t),
        None => info!("Navigation never initialised"),
    }
    info!(
        "{} frames, final position error {:.2} m, max {:.2} m, final velocity error {:.3} m/s",
        summary.frames,
        summary.final_pos_error_m,
        summary.max_pos_error_m,
        summary.final_vel_error_mps
    );
    Ok(())
}
