// skylark_core/src/output.rs

//! Quantities derived from the navigation filter estimate each frame.

use std::f32::consts::PI;

use nalgebra::Vector3;

use crate::geodesy::lla_to_ned;

/// Altitude above home, positive up.
pub fn relative_altitude(ned_pos_m: &Vector3<f32>) -> f32 {
    -ned_pos_m.z
}

/// Horizontal speed over ground.
pub fn ground_speed(ned_vel_mps: &Vector3<f32>) -> f32 {
    ned_vel_mps.x.hypot(ned_vel_mps.y)
}

/// Direction of horizontal motion, clockwise from north, in (-pi, pi].
pub fn ground_track(ned_vel_mps: &Vector3<f32>) -> f32 {
    let track = ned_vel_mps.y.atan2(ned_vel_mps.x);
    if track <= -PI {
        PI
    } else {
        track
    }
}

/// Climb angle of the velocity vector; positive when climbing.
pub fn flight_path_angle(ned_vel_mps: &Vector3<f32>) -> f32 {
    (-ned_vel_mps.z).atan2(ground_speed(ned_vel_mps))
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedOutputs {
    pub ned_pos_m: Vector3<f32>,
    pub alt_rel_m: f32,
    pub alt_msl_m: f32,
    pub gnd_spd_mps: f32,
    pub gnd_track_rad: f32,
    pub flight_path_rad: f32,
}

/// Derives the output quantities from the current estimate.
///
/// * `lla`: estimated `[lat_rad, lon_rad, alt_wgs84_m]`.
/// * `home_lla`: captured home position in the same layout.
/// * `geoid_height_m`: WGS84 minus MSL altitude captured with home.
pub fn derive(
    lla: &Vector3<f64>,
    ned_vel_mps: &Vector3<f32>,
    home_lla: &Vector3<f64>,
    geoid_height_m: f32,
) -> DerivedOutputs {
    let ned_pos_m: Vector3<f32> = lla_to_ned(lla, home_lla).cast();
    DerivedOutputs {
        ned_pos_m,
        alt_rel_m: relative_altitude(&ned_pos_m),
        alt_msl_m: lla.z as f32 - geoid_height_m,
        gnd_spd_mps: ground_speed(ned_vel_mps),
        gnd_track_rad: ground_track(ned_vel_mps),
        flight_path_rad: flight_path_angle(ned_vel_mps),
    }
}
