// skylark_sim/src/scenario/config.rs

use serde::Deserialize;
use skylark_core::prelude::*;

use crate::error::SimError;

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// The root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: Simulation,

    #[serde(default)]
    pub nav: NavConfig,

    #[serde(default)]
    pub sensors: SensorConfig,

    #[serde(default)]
    pub ekf: EkfTuning,

    #[serde(default)]
    pub trajectory: Trajectory,

    #[serde(default)]
    pub gnss: GnssSim,

    #[serde(default)]
    pub noise: NoiseConfig,
}

impl ScenarioConfig {
    /// Checks everything that would otherwise only fail mid-run.
    pub fn validate(&self) -> Result<(), SimError> {
        self.nav.validate()?;

        let sim = &self.simulation;
        if !sim.duration_seconds.is_finite() || sim.duration_seconds <= 0.0 {
            return Err(SimError::Parameter(format!(
                "duration_seconds must be positive, got {}",
                sim.duration_seconds
            )));
        }
        if sim.report_interval_seconds.is_nan() || sim.report_interval_seconds < 0.0 {
            return Err(SimError::Parameter(format!(
                "report_interval_seconds must not be negative, got {}",
                sim.report_interval_seconds
            )));
        }
        if self.sensors.gnss.sampling_period_ms == 0 {
            return Err(SimError::Parameter(
                "gnss sampling_period_ms must be positive".to_string(),
            ));
        }
        if self.sensors.static_pres.sampling_period_ms == 0
            || self.sensors.diff_pres.sampling_period_ms == 0
        {
            return Err(SimError::Parameter(
                "pressure sampling_period_ms must be positive".to_string(),
            ));
        }

        for (name, value) in self.noise.stddevs() {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::Noise { name, value });
            }
        }
        Ok(())
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Simulation {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Duration of the simulation in seconds.
    pub duration_seconds: f32,
    /// Seconds between progress log lines; zero disables them.
    pub report_interval_seconds: f32,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: None,
            duration_seconds: 60.0,
            report_interval_seconds: 5.0,
        }
    }
}

/// Straight, constant-velocity flight from a start point.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Trajectory {
    pub start_lat_deg: f64,
    pub start_lon_deg: f64,
    pub start_alt_wgs84_m: f32,
    /// WGS84 altitude minus MSL altitude at the start point.
    pub geoid_height_m: f32,
    /// True airspeed in still air, which is also the ground speed.
    pub airspeed_mps: f32,
    pub heading_deg: f32,
    /// Positive up.
    pub climb_rate_mps: f32,
    /// Earth magnetic field in NED, uT.
    pub mag_field_ned_ut: [f32; 3],
}

impl Default for Trajectory {
    fn default() -> Self {
        Self {
            start_lat_deg: 35.0,
            start_lon_deg: -106.5,
            start_alt_wgs84_m: 1600.0,
            geoid_height_m: -22.0,
            airspeed_mps: 18.0,
            heading_deg: 45.0,
            climb_rate_mps: 0.0,
            mag_field_ned_ut: [23.0, 4.0, 42.0],
        }
    }
}

/// GNSS receiver acquisition behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GnssSim {
    /// Seconds until the receiver reaches `num_sats`.
    pub acquire_time_s: f32,
    /// Satellites tracked at power-up; rises linearly during acquisition.
    pub initial_sats: u8,
    pub num_sats: u8,
}

impl Default for GnssSim {
    fn default() -> Self {
        Self {
            acquire_time_s: 3.0,
            initial_sats: 4,
            num_sats: 16,
        }
    }
}

/// One-sigma white noise and constant sensor biases.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseConfig {
    pub accel_std_mps2: f32,
    pub gyro_std_radps: f32,
    pub mag_std_ut: f32,
    pub gnss_pos_std_m: f32,
    pub gnss_vel_std_mps: f32,
    pub static_pres_std_pa: f32,
    pub diff_pres_std_pa: f32,
    pub accel_bias_mps2: [f32; 3],
    pub gyro_bias_radps: [f32; 3],
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            accel_std_mps2: 0.05,
            gyro_std_radps: 0.002,
            mag_std_ut: 0.3,
            gnss_pos_std_m: 1.5,
            gnss_vel_std_mps: 0.1,
            static_pres_std_pa: 2.0,
            diff_pres_std_pa: 1.0,
            accel_bias_mps2: [0.0; 3],
            gyro_bias_radps: [0.0; 3],
        }
    }
}

impl NoiseConfig {
    pub fn stddevs(&self) -> [(&'static str, f32); 7] {
        [
            ("accelerometer", self.accel_std_mps2),
            ("gyroscope", self.gyro_std_radps),
            ("magnetometer", self.mag_std_ut),
            ("gnss position", self.gnss_pos_std_m),
            ("gnss velocity", self.gnss_vel_std_mps),
            ("static pressure", self.static_pres_std_pa),
            ("differential pressure", self.diff_pres_std_pa),
        ]
    }

    /// All noise and biases switched off.
    pub fn noiseless() -> Self {
        Self {
            accel_std_mps2: 0.0,
            gyro_std_radps: 0.0,
            mag_std_ut: 0.0,
            gnss_pos_std_m: 0.0,
            gnss_vel_std_mps: 0.0,
            static_pres_std_pa: 0.0,
            diff_pres_std_pa: 0.0,
            accel_bias_mps2: [0.0; 3],
            gyro_bias_radps: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::parse_scenario;

    #[test]
    fn test_empty_scenario_uses_defaults() {
        let scenario = parse_scenario("").expect("empty scenario is valid");
        assert_eq!(scenario.nav, NavConfig::default());
        assert_eq!(scenario.sensors, SensorConfig::default());
        assert_eq!(scenario.ekf, EkfTuning::default());
        assert_eq!(scenario.simulation.duration_seconds, 60.0);
    }

    #[test]
    fn test_partial_sections_override_defaults() {
        let scenario = parse_scenario(
            r#"
            [simulation]
            seed = 7
            duration_seconds = 12.5

            [nav]
            mag_cutoff_hz = 2.0

            [sensors]
            pitot_static_installed = false

            [sensors.imu]
            frame_rate = 50
            "#,
        )
        .expect("valid scenario");

        assert_eq!(scenario.simulation.seed, Some(7));
        assert_eq!(scenario.simulation.duration_seconds, 12.5);
        assert_eq!(scenario.nav.mag_cutoff_hz, 2.0);
        assert_eq!(scenario.nav.accel_cutoff_hz, 20.0);
        assert!(!scenario.sensors.pitot_static_installed);
        assert_eq!(scenario.sensors.imu.frame_rate, FrameRate::Hz50);
    }

    #[test]
    fn test_unsupported_frame_rate_is_rejected() {
        let result = parse_scenario(
            r#"
            [sensors.imu]
            frame_rate = 400
            "#,
        );
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = parse_scenario(
            r#"
            [nav]
            accel_cutof_hz = 20.0
            "#,
        );
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn test_invalid_cutoff_is_rejected() {
        let result = parse_scenario(
            r#"
            [nav]
            static_pres_cutoff_hz = 0.0
            "#,
        );
        assert!(matches!(
            result,
            Err(SimError::Nav(NavError::InvalidCutoff { .. }))
        ));
    }

    #[test]
    fn test_negative_noise_is_rejected() {
        let result = parse_scenario(
            r#"
            [noise]
            gyro_std_radps = -0.1
            "#,
        );
        assert!(matches!(
            result,
            Err(SimError::Noise {
                name: "gyroscope",
                ..
            })
        ));
    }
}
