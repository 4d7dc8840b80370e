// skylark_core/src/estimation/ekf15.rs

//! A 15-state error-state Extended Kalman Filter for GNSS-aided inertial
//! navigation.
//!
//! Nominal state: NED position relative to home, NED velocity, body-to-NED
//! attitude quaternion, accelerometer bias, gyroscope bias.
//! Error state (15): `[dp, dv, dtheta, dba, dbg]`, attitude error expressed in
//! the body frame.

use nalgebra::{Matrix3, SMatrix, SVector, Unit, UnitQuaternion, Vector3};
use serde::Deserialize;
use tracing::debug;

use super::{Attitude, NavFilter};
use crate::geodesy::{lla_to_ned, ned_to_lla};

// ---------------------------------------------------------------------------
// CONFIGURATION
// ---------------------------------------------------------------------------
type Scalar = f64;

const GRAVITY: Scalar = 9.80665;

type Vector3r = Vector3<Scalar>;
type Matrix3r = Matrix3<Scalar>;
type UnitQuaternionr = UnitQuaternion<Scalar>;
type ErrorCovariance = SMatrix<Scalar, 15, 15>;

// ---------------------------------------------------------------------------
// STATUS & TUNING
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterStatus {
    Updated,
    NotInitialized,
    RejectedInnovation(Scalar),
    NonFiniteInput,
    SingularMatrix,
}

/// Noise model and initial uncertainty. Variances unless named otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EkfTuning {
    pub accel_noise_density: Scalar,
    pub gyro_noise_density: Scalar,
    pub accel_bias_instability: Scalar,
    pub gyro_bias_instability: Scalar,
    pub r_gnss_pos: Scalar,
    pub r_gnss_vel: Scalar,
    /// Normalised innovation above which a GNSS fix is discarded.
    pub innovation_gate: Scalar,
    pub p0_pos: Scalar,
    pub p0_vel: Scalar,
    pub p0_att: Scalar,
    pub p0_accel_bias: Scalar,
    pub p0_gyro_bias: Scalar,
}

impl Default for EkfTuning {
    fn default() -> Self {
        Self {
            accel_noise_density: 0.05,
            gyro_noise_density: 0.00175,
            accel_bias_instability: 1e-4,
            gyro_bias_instability: 1e-6,
            r_gnss_pos: 9.0,
            r_gnss_vel: 0.25,
            innovation_gate: 5.0,
            p0_pos: 10.0,
            p0_vel: 1.0,
            p0_att: 0.1,
            p0_accel_bias: 0.1,
            p0_gyro_bias: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// STATE
// ---------------------------------------------------------------------------
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NominalState {
    /// Relative to home, m.
    pub position: Vector3r,
    pub velocity: Vector3r,
    /// Body to NED.
    pub orientation: UnitQuaternionr,
    pub accel_bias: Vector3r,
    pub gyro_bias: Vector3r,
}

impl Default for NominalState {
    fn default() -> Self {
        Self {
            position: Vector3r::zeros(),
            velocity: Vector3r::zeros(),
            orientation: UnitQuaternionr::identity(),
            accel_bias: Vector3r::zeros(),
            gyro_bias: Vector3r::zeros(),
        }
    }
}

// ---------------------------------------------------------------------------
// MAIN FILTER
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct Ekf15State {
    pub state: NominalState,
    pub p_cov: ErrorCovariance,
    pub tuning: EkfTuning,

    home_lla: Option<Vector3<f64>>,
    time_s: Scalar,
    last_status: FilterStatus,
}

impl Default for Ekf15State {
    fn default() -> Self {
        Self::new(EkfTuning::default())
    }
}

impl Ekf15State {
    pub fn new(tuning: EkfTuning) -> Self {
        Self {
            state: NominalState::default(),
            p_cov: initial_covariance(&tuning),
            tuning,
            home_lla: None,
            time_s: 0.0,
            last_status: FilterStatus::NotInitialized,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.home_lla.is_some()
    }

    /// Seconds of propagated time since `initialize`.
    pub fn time_s(&self) -> Scalar {
        self.time_s
    }

    /// Outcome of the most recent GNSS correction.
    pub fn last_status(&self) -> FilterStatus {
        self.last_status
    }

    // =====================================================================
    // PREDICT
    // =====================================================================
    fn predict(&mut self, accel: Vector3r, gyro: Vector3r, dt: Scalar) {
        let a_unbiased = accel - self.state.accel_bias;
        let q_rot = self.state.orientation.to_rotation_matrix();
        let a_ned = q_rot * a_unbiased + Vector3r::new(0.0, 0.0, GRAVITY);

        self.state.position += self.state.velocity * dt + 0.5 * a_ned * dt * dt;
        self.state.velocity += a_ned * dt;

        let w_unbiased = gyro - self.state.gyro_bias;
        let angle = w_unbiased.norm() * dt;
        if angle > 1e-12 {
            let delta = UnitQuaternionr::from_axis_angle(&Unit::new_normalize(w_unbiased), angle);
            self.state.orientation *= delta;
        }

        self.propagate_cov(dt, a_unbiased, w_unbiased, q_rot.matrix());
        self.time_s += dt;
    }

    fn propagate_cov(
        &mut self,
        dt: Scalar,
        a_unbiased: Vector3r,
        w_unbiased: Vector3r,
        rot_mat: &Matrix3r,
    ) {
        let mut f = ErrorCovariance::identity();
        f.fixed_view_mut::<3, 3>(0, 3).fill_diagonal(dt);

        let vel_att = -(rot_mat * skew_symmetric(a_unbiased)) * dt;
        f.fixed_view_mut::<3, 3>(3, 6).copy_from(&vel_att);
        f.fixed_view_mut::<3, 3>(3, 9).copy_from(&(-(rot_mat * dt)));

        let att_att = Matrix3r::identity() - skew_symmetric(w_unbiased) * dt;
        f.fixed_view_mut::<3, 3>(6, 6).copy_from(&att_att);
        f.fixed_view_mut::<3, 3>(6, 12).fill_diagonal(-dt);

        let t = &self.tuning;
        let mut q = ErrorCovariance::zeros();
        q.fixed_view_mut::<3, 3>(3, 3)
            .fill_diagonal(t.accel_noise_density.powi(2) * dt);
        q.fixed_view_mut::<3, 3>(6, 6)
            .fill_diagonal(t.gyro_noise_density.powi(2) * dt);
        q.fixed_view_mut::<3, 3>(9, 9)
            .fill_diagonal(t.accel_bias_instability * dt);
        q.fixed_view_mut::<3, 3>(12, 12)
            .fill_diagonal(t.gyro_bias_instability * dt);

        self.p_cov = f * self.p_cov * f.transpose() + q;
        self.p_cov = (self.p_cov + self.p_cov.transpose()) * 0.5;
    }

    // =====================================================================
    // UPDATES
    // =====================================================================
    fn apply_correction<const D: usize>(
        &mut self,
        h: &SMatrix<Scalar, D, 15>,
        innovation: &SVector<Scalar, D>,
        r: &SMatrix<Scalar, D, D>,
    ) -> FilterStatus {
        if !innovation.iter().all(|v| v.is_finite()) {
            return FilterStatus::NonFiniteInput;
        }

        let s = h * self.p_cov * h.transpose() + r;

        let s_diag_norm = s.diagonal().map(|v| v.sqrt()).norm();
        if s_diag_norm > 1e-10 {
            let normalized_inn = innovation.norm() / s_diag_norm;
            if normalized_inn > self.tuning.innovation_gate {
                return FilterStatus::RejectedInnovation(normalized_inn);
            }
        }

        let Some(s_inv) = s.try_inverse() else {
            return FilterStatus::SingularMatrix;
        };

        let k_gain = self.p_cov * h.transpose() * s_inv;
        let dx = k_gain * innovation;

        self.state.position += dx.fixed_rows::<3>(0).into_owned();
        self.state.velocity += dx.fixed_rows::<3>(3).into_owned();

        let theta: Vector3r = dx.fixed_rows::<3>(6).into_owned();
        if theta.norm() > 1e-12 {
            let correction =
                UnitQuaternionr::from_axis_angle(&Unit::new_normalize(theta), theta.norm());
            self.state.orientation *= correction;
        }

        self.state.accel_bias += dx.fixed_rows::<3>(9).into_owned();
        self.state.gyro_bias += dx.fixed_rows::<3>(12).into_owned();

        // Joseph form keeps P symmetric positive definite.
        let i_minus_kh = ErrorCovariance::identity() - k_gain * h;
        self.p_cov =
            i_minus_kh * self.p_cov * i_minus_kh.transpose() + k_gain * r * k_gain.transpose();

        FilterStatus::Updated
    }

    fn update_gnss(&mut self, vel_ned: Vector3r, lla: &Vector3<f64>) -> FilterStatus {
        let Some(home) = self.home_lla else {
            return FilterStatus::NotInitialized;
        };

        let pos_inn = lla_to_ned(lla, &home) - self.state.position;
        let vel_inn = vel_ned - self.state.velocity;

        let mut innovation = SVector::<Scalar, 6>::zeros();
        innovation.fixed_rows_mut::<3>(0).copy_from(&pos_inn);
        innovation.fixed_rows_mut::<3>(3).copy_from(&vel_inn);

        let mut h = SMatrix::<Scalar, 6, 15>::zeros();
        h.fixed_view_mut::<3, 3>(0, 0).fill_diagonal(1.0);
        h.fixed_view_mut::<3, 3>(3, 3).fill_diagonal(1.0);

        let mut r = SMatrix::<Scalar, 6, 6>::zeros();
        r.fixed_view_mut::<3, 3>(0, 0)
            .fill_diagonal(self.tuning.r_gnss_pos);
        r.fixed_view_mut::<3, 3>(3, 3)
            .fill_diagonal(self.tuning.r_gnss_vel);

        self.apply_correction(&h, &innovation, &r)
    }
}

impl NavFilter for Ekf15State {
    fn initialize(
        &mut self,
        accel: &Vector3<f32>,
        _gyro: &Vector3<f32>,
        mag: &Vector3<f32>,
        gnss_ned_vel: &Vector3<f32>,
        home_lla: &Vector3<f64>,
    ) {
        self.state = NominalState {
            velocity: gnss_ned_vel.cast::<Scalar>(),
            orientation: initial_attitude(&accel.cast(), &mag.cast()),
            ..NominalState::default()
        };
        self.p_cov = initial_covariance(&self.tuning);
        self.home_lla = Some(*home_lla);
        self.time_s = 0.0;
        self.last_status = FilterStatus::Updated;
    }

    fn time_update(&mut self, accel: &Vector3<f32>, gyro: &Vector3<f32>, dt_s: f32) {
        if self.home_lla.is_none() || !(dt_s > 0.0 && dt_s.is_finite()) {
            return;
        }
        if !accel.iter().chain(gyro.iter()).all(|v| v.is_finite()) {
            debug!("Skipping time update with non-finite IMU sample");
            return;
        }
        self.predict(accel.cast(), gyro.cast(), dt_s as Scalar);
    }

    fn measurement_update(&mut self, gnss_ned_vel: &Vector3<f32>, gnss_lla: &Vector3<f64>) {
        let status = self.update_gnss(gnss_ned_vel.cast(), gnss_lla);
        if status != FilterStatus::Updated {
            debug!("GNSS correction skipped: {:?}", status);
        }
        self.last_status = status;
    }

    fn attitude(&self) -> Attitude {
        let (roll, pitch, yaw) = self.state.orientation.euler_angles();
        Attitude {
            roll_rad: roll as f32,
            pitch_rad: pitch as f32,
            yaw_rad: yaw as f32,
        }
    }

    fn lla(&self) -> Vector3<f64> {
        match &self.home_lla {
            Some(home) => ned_to_lla(&self.state.position, home),
            None => Vector3::zeros(),
        }
    }

    fn ned_vel(&self) -> Vector3<f32> {
        self.state.velocity.cast()
    }

    fn accel_bias(&self) -> Vector3<f32> {
        self.state.accel_bias.cast()
    }

    fn gyro_bias(&self) -> Vector3<f32> {
        self.state.gyro_bias.cast()
    }
}

// =====================================================================
// HELPERS
// =====================================================================
fn initial_covariance(t: &EkfTuning) -> ErrorCovariance {
    let mut p = ErrorCovariance::zeros();
    p.fixed_view_mut::<3, 3>(0, 0).fill_diagonal(t.p0_pos);
    p.fixed_view_mut::<3, 3>(3, 3).fill_diagonal(t.p0_vel);
    p.fixed_view_mut::<3, 3>(6, 6).fill_diagonal(t.p0_att);
    p.fixed_view_mut::<3, 3>(9, 9).fill_diagonal(t.p0_accel_bias);
    p.fixed_view_mut::<3, 3>(12, 12).fill_diagonal(t.p0_gyro_bias);
    p
}

/// Roll and pitch from the gravity direction, heading from the
/// tilt-compensated magnetic field.
fn initial_attitude(accel: &Vector3r, mag: &Vector3r) -> UnitQuaternionr {
    let roll = (-accel.y).atan2(-accel.z);
    let pitch = accel.x.atan2((accel.y * accel.y + accel.z * accel.z).sqrt());

    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let mx_h = mag.x * cp + mag.y * sr * sp + mag.z * cr * sp;
    let my_h = mag.y * cr - mag.z * sr;
    let yaw = (-my_h).atan2(mx_h);

    UnitQuaternionr::from_euler_angles(roll, pitch, yaw)
}

fn skew_symmetric(v: Vector3r) -> Matrix3r {
    Matrix3r::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}
