// skylark_core/src/filters/bank.rs

use nalgebra::Vector3;

use super::iir::LowPassFilter;
use crate::config::{FrameRate, NavConfig};
use crate::messages::SensorData;

/// Three independent low-pass filters applied element-wise to a sensor triad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriadFilter {
    axes: [LowPassFilter<f32>; 3],
}

impl TriadFilter {
    pub fn new(cutoff_hz: f32, sample_rate_hz: f32, seed: &Vector3<f32>) -> Self {
        Self {
            axes: [
                LowPassFilter::new(cutoff_hz, sample_rate_hz, seed.x),
                LowPassFilter::new(cutoff_hz, sample_rate_hz, seed.y),
                LowPassFilter::new(cutoff_hz, sample_rate_hz, seed.z),
            ],
        }
    }

    pub fn filter(&mut self, input: &Vector3<f32>) -> Vector3<f32> {
        Vector3::from_fn(|i, _| self.axes[i].filter(input[i]))
    }

    pub fn output(&self) -> Vector3<f32> {
        Vector3::from_fn(|i, _| self.axes[i].output())
    }

    pub fn axis(&self, i: usize) -> &LowPassFilter<f32> {
        &self.axes[i]
    }
}

// =========================================================================
// == Filter Bank ==
// =========================================================================

/// All eleven channel filters of the navigation pipeline.
///
/// Built once, on the frame the pipeline initialises, from the raw readings of
/// that frame. The differential pressure filter only exists when a pitot-static
/// probe is installed.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    accel: TriadFilter,
    gyro: TriadFilter,
    mag: TriadFilter,
    static_pres: LowPassFilter<f32>,
    diff_pres: Option<LowPassFilter<f32>>,
}

impl FilterBank {
    /// Seeds every filter with the current raw reading of its channel.
    pub fn new(config: &NavConfig, frame_rate: FrameRate, sensors: &SensorData) -> Self {
        let frame_hz = frame_rate.hz() as f32;
        let mag_hz = frame_rate.mag_rate_hz();
        let imu = &sensors.imu;

        let diff_pres = sensors.pitot_static_installed.then(|| {
            LowPassFilter::new(
                config.diff_pres_cutoff_hz,
                frame_hz,
                sensors.diff_pres.pres_pa,
            )
        });

        Self {
            accel: TriadFilter::new(config.accel_cutoff_hz, frame_hz, &imu.accel_mps2),
            gyro: TriadFilter::new(config.gyro_cutoff_hz, frame_hz, &imu.gyro_radps),
            mag: TriadFilter::new(config.mag_cutoff_hz, mag_hz, &imu.mag_ut),
            static_pres: LowPassFilter::new(
                config.static_pres_cutoff_hz,
                frame_hz,
                sensors.static_pres.pres_pa,
            ),
            diff_pres,
        }
    }

    pub fn filter_accel(&mut self, accel_mps2: &Vector3<f32>) -> Vector3<f32> {
        self.accel.filter(accel_mps2)
    }

    pub fn filter_gyro(&mut self, gyro_radps: &Vector3<f32>) -> Vector3<f32> {
        self.gyro.filter(gyro_radps)
    }

    /// Only call with fresh magnetometer samples; the filter runs at the mag rate.
    pub fn filter_mag(&mut self, mag_ut: &Vector3<f32>) -> Vector3<f32> {
        self.mag.filter(mag_ut)
    }

    pub fn filter_static_pres(&mut self, pres_pa: f32) -> f32 {
        self.static_pres.filter(pres_pa)
    }

    /// Returns `None` when no differential pressure channel is installed.
    pub fn filter_diff_pres(&mut self, pres_pa: f32) -> Option<f32> {
        self.diff_pres.as_mut().map(|lpf| lpf.filter(pres_pa))
    }

    pub fn accel(&self) -> &TriadFilter {
        &self.accel
    }

    pub fn gyro(&self) -> &TriadFilter {
        &self.gyro
    }

    pub fn mag(&self) -> &TriadFilter {
        &self.mag
    }

    pub fn static_pres(&self) -> &LowPassFilter<f32> {
        &self.static_pres
    }

    pub fn diff_pres(&self) -> Option<&LowPassFilter<f32>> {
        self.diff_pres.as_ref()
    }

    /// Sample rate the magnetometer triad was initialised with.
    pub fn mag_sample_rate_hz(&self) -> f32 {
        self.mag.axis(0).sample_rate_hz()
    }
}
