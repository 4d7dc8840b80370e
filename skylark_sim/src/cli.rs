// skylark_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Skylark: a headless navigation scenario runner.
///
/// Synthesises sensor frames for a fixed-wing trajectory, runs them through
/// the navigation pipeline and reports the solution against truth.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/default.toml")]
    pub scenario: PathBuf,

    /// Override the scenario duration, in seconds.
    #[arg(short, long)]
    pub duration: Option<f32>,

    /// Override the scenario PRNG seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Seconds between progress reports. Zero disables them.
    #[arg(long)]
    pub report_interval: Option<f32>,
}
