// skylark_core/src/estimation/mod.rs

use nalgebra::Vector3;

/// Euler attitude of the body frame relative to NED, radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub roll_rad: f32,
    pub pitch_rad: f32,
    pub yaw_rad: f32,
}

/// The contract for any algorithm that plays the "navigation filter" role.
///
/// The pipeline treats the implementation as a black box. It promises to call
/// `initialize` exactly once before anything else, then at most one
/// `time_update` per frame (only when fresh IMU data arrived) followed by zero
/// or more `measurement_update` calls (only when a fresh GNSS fix arrived).
/// The accessors are read every frame, whether or not anything was updated.
///
/// Implementations must not panic on bad input; a problematic measurement
/// should be skipped.
pub trait NavFilter: Send {
    /// One-time seeding from the first frame where every sensor is ready.
    ///
    /// * `accel`, `gyro`, `mag`: body-frame IMU triad (m/s^2, rad/s, uT).
    /// * `gnss_ned_vel`: GNSS velocity, m/s.
    /// * `home_lla`: `[lat_rad, lon_rad, alt_wgs84_m]` of the home position.
    fn initialize(
        &mut self,
        accel: &Vector3<f32>,
        gyro: &Vector3<f32>,
        mag: &Vector3<f32>,
        gnss_ned_vel: &Vector3<f32>,
        home_lla: &Vector3<f64>,
    );

    /// Propagates the estimate forward by `dt_s` using the inertial sample.
    fn time_update(&mut self, accel: &Vector3<f32>, gyro: &Vector3<f32>, dt_s: f32);

    /// Corrects the propagated estimate with a GNSS fix.
    fn measurement_update(&mut self, gnss_ned_vel: &Vector3<f32>, gnss_lla: &Vector3<f64>);

    fn attitude(&self) -> Attitude;

    /// Current geodetic position `[lat_rad, lon_rad, alt_wgs84_m]`.
    fn lla(&self) -> Vector3<f64>;

    fn ned_vel(&self) -> Vector3<f32>;

    fn accel_bias(&self) -> Vector3<f32>;

    fn gyro_bias(&self) -> Vector3<f32>;
}

impl<F: NavFilter + ?Sized> NavFilter for Box<F> {
    fn initialize(
        &mut self,
        accel: &Vector3<f32>,
        gyro: &Vector3<f32>,
        mag: &Vector3<f32>,
        gnss_ned_vel: &Vector3<f32>,
        home_lla: &Vector3<f64>,
    ) {
        (**self).initialize(accel, gyro, mag, gnss_ned_vel, home_lla)
    }

    fn time_update(&mut self, accel: &Vector3<f32>, gyro: &Vector3<f32>, dt_s: f32) {
        (**self).time_update(accel, gyro, dt_s)
    }

    fn measurement_update(&mut self, gnss_ned_vel: &Vector3<f32>, gnss_lla: &Vector3<f64>) {
        (**self).measurement_update(gnss_ned_vel, gnss_lla)
    }

    fn attitude(&self) -> Attitude {
        (**self).attitude()
    }

    fn lla(&self) -> Vector3<f64> {
        (**self).lla()
    }

    fn ned_vel(&self) -> Vector3<f32> {
        (**self).ned_vel()
    }

    fn accel_bias(&self) -> Vector3<f32> {
        (**self).accel_bias()
    }

    fn gyro_bias(&self) -> Vector3<f32> {
        (**self).gyro_bias()
    }
}

pub mod ekf15;
