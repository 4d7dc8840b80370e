// skylark_core/src/filters/iir.rs

use num_traits::{Float, FloatConst};

/// First order (single-pole) IIR low-pass filter.
///
/// `y[k] = y[k-1] + alpha * (x[k] - y[k-1])` with
/// `alpha = dt / (rc + dt)`, `rc = 1 / (2 pi fc)`.
///
/// The pole is only meaningful if `filter` is called at the sample rate the
/// filter was initialised with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPassFilter<T> {
    cutoff_hz: T,
    sample_rate_hz: T,
    alpha: T,
    last_output: T,
}

impl<T: Float + FloatConst> LowPassFilter<T> {
    /// Creates a filter whose output is already settled at `seed`.
    ///
    /// Seeding with the first real sample avoids the start-up transient a
    /// zero-initialised filter would show.
    pub fn new(cutoff_hz: T, sample_rate_hz: T, seed: T) -> Self {
        let dt = T::one() / sample_rate_hz;
        let rc = T::one() / ((T::PI() + T::PI()) * cutoff_hz);
        let alpha = dt / (rc + dt);
        Self {
            cutoff_hz,
            sample_rate_hz,
            alpha: alpha.max(T::zero()).min(T::one()),
            last_output: seed,
        }
    }

    /// Re-initialises the filter in place.
    pub fn init(&mut self, cutoff_hz: T, sample_rate_hz: T, seed: T) {
        *self = Self::new(cutoff_hz, sample_rate_hz, seed);
    }

    /// Consumes one new sample and returns the smoothed value.
    pub fn filter(&mut self, input: T) -> T {
        self.last_output = self.last_output + self.alpha * (input - self.last_output);
        self.last_output
    }

    pub fn output(&self) -> T {
        self.last_output
    }

    pub fn cutoff_hz(&self) -> T {
        self.cutoff_hz
    }

    pub fn sample_rate_hz(&self) -> T {
        self.sample_rate_hz
    }

    pub fn alpha(&self) -> T {
        self.alpha
    }
}
