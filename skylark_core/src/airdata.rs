// skylark_core/src/airdata.rs

//! International Standard Atmosphere air-data formulas (troposphere only).

/// Sea-level standard pressure, Pa.
pub const P0_PA: f32 = 101_325.0;
/// Sea-level standard temperature, K.
pub const T0_K: f32 = 288.15;
/// Tropospheric temperature lapse rate, K/m.
pub const LAPSE_RATE_K_PER_M: f32 = 0.0065;
/// Sea-level speed of sound, m/s.
pub const A0_MPS: f32 = 340.29;

/// `R * L / g0` for dry air.
const BAROMETRIC_EXPONENT: f32 = 0.190_263;

/// Pressure altitude above the standard sea-level datum.
pub fn pressure_altitude_m(static_pres_pa: f32) -> f32 {
    (T0_K / LAPSE_RATE_K_PER_M) * (1.0 - (static_pres_pa / P0_PA).powf(BAROMETRIC_EXPONENT))
}

/// Indicated airspeed from impact (differential) pressure.
///
/// Negative differential pressure, e.g. sensor offset at rest, reads as zero.
pub fn indicated_airspeed_mps(diff_pres_pa: f32) -> f32 {
    let qc = diff_pres_pa.max(0.0);
    A0_MPS * (5.0 * ((qc / P0_PA + 1.0).powf(2.0 / 7.0) - 1.0)).sqrt()
}

/// Standard static pressure at a pressure altitude. Inverse of
/// [`pressure_altitude_m`].
pub fn static_pressure_pa(alt_m: f32) -> f32 {
    P0_PA * (1.0 - LAPSE_RATE_K_PER_M * alt_m / T0_K).powf(1.0 / BAROMETRIC_EXPONENT)
}

/// Impact pressure sensed at an indicated airspeed. Inverse of
/// [`indicated_airspeed_mps`] for non-negative speeds.
pub fn impact_pressure_pa(ias_mps: f32) -> f32 {
    let mach = ias_mps.max(0.0) / A0_MPS;
    P0_PA * ((1.0 + 0.2 * mach * mach).powf(3.5) - 1.0)
}
