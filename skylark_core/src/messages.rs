// skylark_core/src/messages.rs

use nalgebra::Vector3;

// =========================================================================
// == Sensor Inputs (one snapshot per frame) ==
// =========================================================================

/// Number of channels in an inceptor (SBUS) frame.
pub const NUM_INCEPTOR_CH: usize = 16;

/// The latest pilot inceptor frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InceptorData {
    pub new_data: bool,
    pub lost_frame: bool,
    pub failsafe: bool,
    pub ch17: bool,
    pub ch18: bool,
    pub ch: [i16; NUM_INCEPTOR_CH],
}

/// Inertial and magnetometer sample, body frame (forward-right-down).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuData {
    pub healthy: bool,
    /// A fresh accelerometer + gyroscope sample arrived this frame.
    pub new_imu_data: bool,
    /// A fresh magnetometer sample arrived this frame.
    pub new_mag_data: bool,
    pub die_temp_c: f32,
    /// Specific force, m/s^2.
    pub accel_mps2: Vector3<f32>,
    pub gyro_radps: Vector3<f32>,
    pub mag_ut: Vector3<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GnssFix {
    #[default]
    None,
    Fix2d,
    Fix3d,
    DgnssFix,
    RtkFloat,
    RtkFixed,
}

/// The latest GNSS solution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GnssData {
    pub healthy: bool,
    pub new_data: bool,
    pub fix: GnssFix,
    pub num_sats: u8,
    pub lat_rad: f64,
    pub lon_rad: f64,
    pub alt_wgs84_m: f32,
    pub alt_msl_m: f32,
    pub horz_acc_m: f32,
    pub vert_acc_m: f32,
    pub ned_vel_mps: Vector3<f32>,
}

impl GnssData {
    /// Geodetic position as `[lat_rad, lon_rad, alt_wgs84_m]`.
    pub fn lla(&self) -> Vector3<f64> {
        Vector3::new(self.lat_rad, self.lon_rad, self.alt_wgs84_m as f64)
    }
}

/// A single pressure transducer reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PresData {
    pub healthy: bool,
    pub new_data: bool,
    pub pres_pa: f32,
    pub die_temp_c: f32,
}

/// Everything the sensor layer collected during one frame.
///
/// Produced once per frame by the acquisition layer and only read by the
/// navigation pipeline. A sensor that failed to read simply reports
/// `new_data = false`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorData {
    /// Whether a dedicated pitot-static probe supplies airspeed.
    pub pitot_static_installed: bool,
    pub inceptor: InceptorData,
    pub imu: ImuData,
    pub gnss: GnssData,
    pub static_pres: PresData,
    pub diff_pres: PresData,
}

// =========================================================================
// == Navigation Output ==
// =========================================================================

/// The navigation solution published every frame.
///
/// Fields are only overwritten when the pipeline has something new to say, so
/// the caller should keep one instance alive across frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NavData {
    pub nav_initialized: bool,
    pub pitch_rad: f32,
    pub roll_rad: f32,
    pub heading_rad: f32,
    pub alt_wgs84_m: f32,
    pub home_alt_wgs84_m: f32,
    pub alt_msl_m: f32,
    /// Altitude above home, positive up.
    pub alt_rel_m: f32,
    pub static_pres_pa: f32,
    pub diff_pres_pa: f32,
    /// Barometric altitude from the filtered static pressure.
    pub alt_pres_m: f32,
    pub ias_mps: f32,
    pub gnd_spd_mps: f32,
    /// Clockwise from north, in (-pi, pi].
    pub gnd_track_rad: f32,
    /// Positive when climbing.
    pub flight_path_rad: f32,
    pub accel_bias_mps2: Vector3<f32>,
    pub gyro_bias_radps: Vector3<f32>,
    pub accel_mps2: Vector3<f32>,
    pub gyro_radps: Vector3<f32>,
    pub mag_ut: Vector3<f32>,
    /// Position relative to home.
    pub ned_pos_m: Vector3<f32>,
    pub ned_vel_mps: Vector3<f32>,
    pub lat_rad: f64,
    pub lon_rad: f64,
    pub home_lat_rad: f64,
    pub home_lon_rad: f64,
}
