// skylark_sim/src/lib.rs

// This module contains all the simulation-specific logic.
pub mod cli;
pub mod error;
pub mod prng;
pub mod runner;
pub mod scenario;
pub mod sensors;

pub use runner::{run_scenario, RunSummary};
