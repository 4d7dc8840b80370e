// skylark_core/src/error.rs

use thiserror::Error;

/// Errors raised while configuring the navigation pipeline.
///
/// The per-frame entry point never fails; every variant here is a startup
/// (configuration) problem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    /// The frame rate has no entry in the magnetometer rate lookup table.
    #[error("unsupported frame rate {0} Hz (expected 50, 100 or 200)")]
    UnsupportedFrameRate(u16),

    /// A low-pass cutoff is zero, negative or not a number.
    #[error("invalid {channel} cutoff frequency: {hz} Hz")]
    InvalidCutoff { channel: &'static str, hz: f32 },
}
