// skylark_sim/src/error.rs

use skylark_core::error::NavError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to load scenario: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error(transparent)]
    Nav(#[from] NavError),

    #[error("invalid {name} noise standard deviation {value}")]
    Noise { name: &'static str, value: f32 },

    #[error("invalid simulation parameter: {0}")]
    Parameter(String),
}

impl From<figment::Error> for SimError {
    fn from(err: figment::Error) -> Self {
        SimError::Config(Box::new(err))
    }
}
