// skylark_core/src/config.rs

//! Static configuration consumed by the navigation pipeline.
//!
//! Everything here is read once at startup and never mutated afterwards.
//! All structs deserialize with defaults, so a configuration file only has to
//! name the values it wants to change.

use serde::Deserialize;
use tracing::warn;

use crate::error::NavError;

// =========================================================================
// == Frame Rate ==
// =========================================================================

/// The fixed rate of the frame timer, which matches the IMU sampling rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "u16")]
#[repr(u8)]
pub enum FrameRate {
    Hz50 = 0,
    #[default]
    Hz100 = 1,
    Hz200 = 2,
}

/// `(frame rate, effective magnetometer rate)` indexed by `FrameRate as usize`.
///
/// The magnetometer delivers fresh samples less often than the IMU at low
/// frame rates, so its filters are driven at their own rate.
const FRAME_RATE_TABLE: [(u16, f32); 3] = [(50, 8.0), (100, 100.0), (200, 100.0)];

impl FrameRate {
    pub const ALL: [FrameRate; 3] = [FrameRate::Hz50, FrameRate::Hz100, FrameRate::Hz200];

    /// Frame rate in Hz.
    pub fn hz(self) -> u16 {
        FRAME_RATE_TABLE[self as usize].0
    }

    /// The fixed frame period used as the time-update step.
    pub fn period_s(self) -> f32 {
        1.0 / self.hz() as f32
    }

    /// Sample rate the magnetometer filters are initialised with.
    pub fn mag_rate_hz(self) -> f32 {
        FRAME_RATE_TABLE[self as usize].1
    }
}

impl TryFrom<u16> for FrameRate {
    type Error = NavError;

    fn try_from(hz: u16) -> Result<Self, Self::Error> {
        FrameRate::ALL
            .into_iter()
            .find(|rate| rate.hz() == hz)
            .ok_or(NavError::UnsupportedFrameRate(hz))
    }
}

// =========================================================================
// == Navigation Configuration ==
// =========================================================================

/// Low-pass cutoff frequencies, in Hz, for each filtered channel.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavConfig {
    pub accel_cutoff_hz: f32,
    pub gyro_cutoff_hz: f32,
    pub mag_cutoff_hz: f32,
    pub static_pres_cutoff_hz: f32,
    pub diff_pres_cutoff_hz: f32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            accel_cutoff_hz: 20.0,
            gyro_cutoff_hz: 20.0,
            mag_cutoff_hz: 10.0,
            static_pres_cutoff_hz: 10.0,
            diff_pres_cutoff_hz: 10.0,
        }
    }
}

impl NavConfig {
    /// Every cutoff paired with the channel name used in errors and logs.
    pub fn cutoffs(&self) -> [(&'static str, f32); 5] {
        [
            ("accelerometer", self.accel_cutoff_hz),
            ("gyroscope", self.gyro_cutoff_hz),
            ("magnetometer", self.mag_cutoff_hz),
            ("static pressure", self.static_pres_cutoff_hz),
            ("differential pressure", self.diff_pres_cutoff_hz),
        ]
    }

    /// Rejects cutoffs that would not produce a valid filter pole.
    pub fn validate(&self) -> Result<(), NavError> {
        for (channel, hz) in self.cutoffs() {
            if !hz.is_finite() || hz <= 0.0 {
                return Err(NavError::InvalidCutoff { channel, hz });
            }
        }
        Ok(())
    }

    /// Cutoffs at or above the Nyquist rate of their channel, as
    /// `(channel, cutoff_hz, sample_rate_hz)`. Such a filter still works, it
    /// just stops attenuating anything useful.
    pub fn above_nyquist(&self, frame_rate: FrameRate) -> Vec<(&'static str, f32, f32)> {
        let frame_hz = frame_rate.hz() as f32;
        // Same order as `cutoffs()`.
        let sample_rates = [
            frame_hz,
            frame_hz,
            frame_rate.mag_rate_hz(),
            frame_hz,
            frame_hz,
        ];
        self.cutoffs()
            .into_iter()
            .zip(sample_rates)
            .filter(|&((_, hz), rate)| hz >= 0.5 * rate)
            .map(|((channel, hz), rate)| (channel, hz, rate))
            .collect()
    }

    pub(crate) fn warn_above_nyquist(&self, frame_rate: FrameRate) {
        for (channel, hz, sample_rate) in self.above_nyquist(frame_rate) {
            warn!(
                "{} cutoff {} Hz is at or above the Nyquist rate of its {} Hz sample rate",
                channel, hz, sample_rate
            );
        }
    }
}

// =========================================================================
// == Sensor Configuration ==
// =========================================================================

/// Sensor installation and the bus parameters handed to the acquisition layer.
///
/// Only `pitot_static_installed` matters to navigation. The per-device blocks
/// are carried through untouched for the sensor drivers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    /// Whether a dedicated pitot-static probe (static + differential) is fitted.
    pub pitot_static_installed: bool,
    pub imu: ImuConfig,
    pub gnss: GnssConfig,
    pub static_pres: PresConfig,
    pub diff_pres: PresConfig,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            pitot_static_installed: true,
            imu: ImuConfig::default(),
            gnss: GnssConfig::default(),
            static_pres: PresConfig {
                dev: 0x10,
                transducer: "AMS5915_1200_B".to_string(),
                ..PresConfig::default()
            },
            diff_pres: PresConfig {
                dev: 0x11,
                transducer: "AMS5915_0010_D".to_string(),
                ..PresConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImuConfig {
    pub bus: String,
    /// Chip-select pin on the SPI bus.
    pub dev: u8,
    pub frame_rate: FrameRate,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            bus: "SPI1".to_string(),
            dev: 24,
            frame_rate: FrameRate::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GnssConfig {
    pub bus: String,
    pub baud: u32,
    pub sampling_period_ms: u16,
}

impl Default for GnssConfig {
    fn default() -> Self {
        Self {
            bus: "Serial3".to_string(),
            baud: 921_600,
            sampling_period_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresConfig {
    pub bus: String,
    /// I2C address.
    pub dev: u8,
    pub transducer: String,
    pub sampling_period_ms: u16,
}

impl Default for PresConfig {
    fn default() -> Self {
        Self {
            bus: "Wire".to_string(),
            dev: 0x10,
            transducer: String::new(),
            sampling_period_ms: 10,
        }
    }
}
