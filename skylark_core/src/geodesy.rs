// skylark_core/src/geodesy.rs

//! WGS84 coordinate transforms.
//!
//! Geodetic positions are `[lat_rad, lon_rad, alt_wgs84_m]` in double
//! precision; a few centimetres of error at these magnitudes would otherwise
//! show up directly in the home-relative position.

use nalgebra::{Matrix3, Vector3};

/// WGS84 semi-major axis, m.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// First eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

const ECEF_TO_LLA_ITERATIONS: usize = 10;

/// Prime vertical radius of curvature at `lat_rad`.
fn prime_vertical_radius(lat_rad: f64) -> f64 {
    let s = lat_rad.sin();
    WGS84_A / (1.0 - WGS84_E2 * s * s).sqrt()
}

/// Rotation from ECEF axes to the local NED axes at the reference point.
#[rustfmt::skip]
pub fn ecef_to_ned_rotation(ref_lla: &Vector3<f64>) -> Matrix3<f64> {
    let (slat, clat) = ref_lla.x.sin_cos();
    let (slon, clon) = ref_lla.y.sin_cos();
    Matrix3::new(
        -slat * clon, -slat * slon, clat,
        -slon,        clon,         0.0,
        -clat * clon, -clat * slon, -slat,
    )
}

pub fn lla_to_ecef(lla: &Vector3<f64>) -> Vector3<f64> {
    let (slat, clat) = lla.x.sin_cos();
    let (slon, clon) = lla.y.sin_cos();
    let n = prime_vertical_radius(lla.x);
    let h = lla.z;
    Vector3::new(
        (n + h) * clat * clon,
        (n + h) * clat * slon,
        (n * (1.0 - WGS84_E2) + h) * slat,
    )
}

/// Fixed-point iteration on latitude; converges to sub-millimetre in a few steps.
pub fn ecef_to_lla(ecef: &Vector3<f64>) -> Vector3<f64> {
    let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
    let lon = ecef.y.atan2(ecef.x);

    let mut lat = ecef.z.atan2(p * (1.0 - WGS84_E2));
    for _ in 0..ECEF_TO_LLA_ITERATIONS {
        let n = prime_vertical_radius(lat);
        lat = (ecef.z + WGS84_E2 * n * lat.sin()).atan2(p);
    }

    let (slat, clat) = lat.sin_cos();
    let alt = p * clat + ecef.z * slat - WGS84_A * (1.0 - WGS84_E2 * slat * slat).sqrt();
    Vector3::new(lat, lon, alt)
}

/// NED offset of `lla` from the reference point `ref_lla`.
pub fn lla_to_ned(lla: &Vector3<f64>, ref_lla: &Vector3<f64>) -> Vector3<f64> {
    let delta = lla_to_ecef(lla) - lla_to_ecef(ref_lla);
    ecef_to_ned_rotation(ref_lla) * delta
}

/// Geodetic position of the point `ned` metres away from `ref_lla`.
pub fn ned_to_lla(ned: &Vector3<f64>, ref_lla: &Vector3<f64>) -> Vector3<f64> {
    let ecef = lla_to_ecef(ref_lla) + ecef_to_ned_rotation(ref_lla).transpose() * ned;
    ecef_to_lla(&ecef)
}
