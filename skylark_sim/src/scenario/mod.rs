// skylark_sim/src/scenario/mod.rs

//! Loading and validating scenario files.

mod config;

use std::path::Path;

use figment::{
    providers::{Format, Toml},
    Figment,
};

use crate::error::SimError;
pub use config::{GnssSim, NoiseConfig, ScenarioConfig, Simulation, Trajectory};

/// Reads a scenario from disk. Missing sections fall back to their defaults.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, SimError> {
    let scenario: ScenarioConfig = Figment::new().merge(Toml::file(path)).extract()?;
    scenario.validate()?;
    Ok(scenario)
}

/// Parses a scenario from an in-memory TOML string.
pub fn parse_scenario(toml: &str) -> Result<ScenarioConfig, SimError> {
    let scenario: ScenarioConfig = Figment::new().merge(Toml::string(toml)).extract()?;
    scenario.validate()?;
    Ok(scenario)
}
