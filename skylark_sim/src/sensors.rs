// skylark_sim/src/sensors.rs

//! Synthetic sensor frames for a constant-velocity fixed-wing flight.
//!
//! Every sensor runs on its own sample clock. Between samples a sensor keeps
//! reporting its previous reading with the freshness flag cleared, the same way
//! the acquisition layer on the aircraft behaves.

use nalgebra::{UnitQuaternion, Vector3};
use rand_distr::{Distribution, Normal};
use skylark_core::airdata::{impact_pressure_pa, static_pressure_pa};
use skylark_core::geodesy::ned_to_lla;
use skylark_core::messages::{GnssData, GnssFix, ImuData, PresData, SensorData};

use crate::error::SimError;
use crate::prng::SimulationRng;
use crate::scenario::{GnssSim, ScenarioConfig, Trajectory};

const GRAVITY: f32 = 9.80665;

/// Below this many satellites the receiver reports no fix.
const MIN_FIX_SATS: u8 = 4;

/// Fires once per period, on the first frame at or after each sample time.
#[derive(Debug, Clone, Copy)]
struct SampleClock {
    period_s: f64,
    next_s: f64,
}

impl SampleClock {
    fn new(period_s: f64) -> Self {
        Self {
            period_s,
            next_s: 0.0,
        }
    }

    fn poll(&mut self, time_s: f64) -> bool {
        if time_s + 1e-9 < self.next_s {
            return false;
        }
        while self.next_s <= time_s + 1e-9 {
            self.next_s += self.period_s;
        }
        true
    }
}

/// Ground truth at the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruthState {
    pub time_s: f64,
    pub ned_pos_m: Vector3<f64>,
    pub ned_vel_mps: Vector3<f32>,
    /// `[lat_rad, lon_rad, alt_wgs84_m]`
    pub lla: Vector3<f64>,
    pub heading_rad: f32,
}

struct NoiseModel {
    accel: Normal<f32>,
    gyro: Normal<f32>,
    mag: Normal<f32>,
    gnss_pos: Normal<f32>,
    gnss_vel: Normal<f32>,
    static_pres: Normal<f32>,
    diff_pres: Normal<f32>,
    accel_bias: Vector3<f32>,
    gyro_bias: Vector3<f32>,
}

fn normal(name: &'static str, std_dev: f32) -> Result<Normal<f32>, SimError> {
    Normal::new(0.0, std_dev).map_err(|_| SimError::Noise {
        name,
        value: std_dev,
    })
}

fn sample3(dist: &Normal<f32>, rng: &mut SimulationRng) -> Vector3<f32> {
    Vector3::new(
        dist.sample(&mut rng.0),
        dist.sample(&mut rng.0),
        dist.sample(&mut rng.0),
    )
}

// =========================================================================
// == Sensor Simulator ==
// =========================================================================

pub struct SensorSimulator {
    trajectory: Trajectory,
    gnss_sim: GnssSim,
    pitot_static_installed: bool,
    gnss_horz_acc_m: f32,

    start_lla: Vector3<f64>,
    vel_ned: Vector3<f64>,
    body_to_ned: UnitQuaternion<f32>,
    mag_ned: Vector3<f32>,

    frame: u64,
    frame_period_s: f64,
    mag_clock: SampleClock,
    gnss_clock: SampleClock,
    static_clock: SampleClock,
    diff_clock: SampleClock,
    noise: NoiseModel,

    last: SensorData,
}

impl SensorSimulator {
    pub fn new(scenario: &ScenarioConfig) -> Result<Self, SimError> {
        let t = scenario.trajectory.clone();
        let n = &scenario.noise;
        let sensors = &scenario.sensors;
        let frame_rate = sensors.imu.frame_rate;

        let heading = t.heading_deg.to_radians() as f64;
        let speed = t.airspeed_mps as f64;
        let vel_ned = Vector3::new(
            speed * heading.cos(),
            speed * heading.sin(),
            -t.climb_rate_mps as f64,
        );

        let noise = NoiseModel {
            accel: normal("accelerometer", n.accel_std_mps2)?,
            gyro: normal("gyroscope", n.gyro_std_radps)?,
            mag: normal("magnetometer", n.mag_std_ut)?,
            gnss_pos: normal("gnss position", n.gnss_pos_std_m)?,
            gnss_vel: normal("gnss velocity", n.gnss_vel_std_mps)?,
            static_pres: normal("static pressure", n.static_pres_std_pa)?,
            diff_pres: normal("differential pressure", n.diff_pres_std_pa)?,
            accel_bias: Vector3::from(n.accel_bias_mps2),
            gyro_bias: Vector3::from(n.gyro_bias_radps),
        };

        let mut last = SensorData {
            pitot_static_installed: sensors.pitot_static_installed,
            ..SensorData::default()
        };
        last.imu.healthy = true;
        last.inceptor.ch = [1024; skylark_core::messages::NUM_INCEPTOR_CH];

        Ok(Self {
            start_lla: Vector3::new(
                t.start_lat_deg.to_radians(),
                t.start_lon_deg.to_radians(),
                t.start_alt_wgs84_m as f64,
            ),
            vel_ned,
            body_to_ned: UnitQuaternion::from_euler_angles(0.0, 0.0, t.heading_deg.to_radians()),
            mag_ned: Vector3::from(t.mag_field_ned_ut),
            gnss_horz_acc_m: n.gnss_pos_std_m,
            trajectory: t,
            gnss_sim: scenario.gnss.clone(),
            pitot_static_installed: sensors.pitot_static_installed,
            frame: 0,
            frame_period_s: 1.0 / frame_rate.hz() as f64,
            mag_clock: SampleClock::new(1.0 / frame_rate.mag_rate_hz() as f64),
            gnss_clock: SampleClock::new(sensors.gnss.sampling_period_ms as f64 * 1e-3),
            static_clock: SampleClock::new(sensors.static_pres.sampling_period_ms as f64 * 1e-3),
            diff_clock: SampleClock::new(sensors.diff_pres.sampling_period_ms as f64 * 1e-3),
            noise,
            last,
        })
    }

    pub fn time_s(&self) -> f64 {
        self.frame as f64 * self.frame_period_s
    }

    pub fn truth(&self) -> TruthState {
        let time_s = self.time_s();
        let ned_pos_m = self.vel_ned * time_s;
        TruthState {
            time_s,
            ned_pos_m,
            ned_vel_mps: self.vel_ned.cast(),
            lla: ned_to_lla(&ned_pos_m, &self.start_lla),
            heading_rad: self.trajectory.heading_deg.to_radians(),
        }
    }

    /// Satellites tracked at `time_s`, rising linearly during acquisition.
    pub fn num_sats(&self, time_s: f64) -> u8 {
        let g = &self.gnss_sim;
        if g.acquire_time_s <= 0.0 || time_s >= g.acquire_time_s as f64 {
            return g.num_sats;
        }
        let span = g.num_sats.saturating_sub(g.initial_sats) as f64;
        g.initial_sats + (span * time_s / g.acquire_time_s as f64) as u8
    }

    /// Produces the sensor snapshot for the current frame.
    pub fn sample(&mut self, rng: &mut SimulationRng) -> SensorData {
        let truth = self.truth();
        let t = truth.time_s;
        let ned_to_body = self.body_to_ned.inverse();
        let mut s = self.last;

        // --- IMU, fresh every frame ---
        let specific_force = ned_to_body * Vector3::new(0.0, 0.0, -GRAVITY);
        s.imu = ImuData {
            healthy: true,
            new_imu_data: true,
            new_mag_data: self.mag_clock.poll(t),
            die_temp_c: 25.0,
            accel_mps2: specific_force + self.noise.accel_bias + sample3(&self.noise.accel, rng),
            gyro_radps: self.noise.gyro_bias + sample3(&self.noise.gyro, rng),
            mag_ut: s.imu.mag_ut,
        };
        if s.imu.new_mag_data {
            s.imu.mag_ut = ned_to_body * self.mag_ned + sample3(&self.noise.mag, rng);
        }

        // --- GNSS ---
        s.gnss.new_data = self.gnss_clock.poll(t);
        if s.gnss.new_data {
            s.gnss = self.gnss_fix(&truth, rng);
        }

        // --- Air data ---
        let alt_msl_m = truth.lla.z as f32 - self.trajectory.geoid_height_m;
        s.static_pres.new_data = self.static_clock.poll(t);
        if s.static_pres.new_data {
            s.static_pres = PresData {
                healthy: true,
                new_data: true,
                pres_pa: static_pressure_pa(alt_msl_m) + self.noise.static_pres.sample(&mut rng.0),
                die_temp_c: 25.0,
            };
        }

        s.diff_pres.new_data = self.pitot_static_installed && self.diff_clock.poll(t);
        if s.diff_pres.new_data {
            s.diff_pres = PresData {
                healthy: true,
                new_data: true,
                pres_pa: impact_pressure_pa(self.trajectory.airspeed_mps)
                    + self.noise.diff_pres.sample(&mut rng.0),
                die_temp_c: 25.0,
            };
        }

        s.inceptor.new_data = true;
        self.last = s;
        s
    }

    /// Moves to the next frame.
    pub fn advance(&mut self) {
        self.frame += 1;
    }

    fn gnss_fix(&self, truth: &TruthState, rng: &mut SimulationRng) -> GnssData {
        let num_sats = self.num_sats(truth.time_s);
        let pos_noise: Vector3<f64> = sample3(&self.noise.gnss_pos, rng).cast();
        let lla = ned_to_lla(&(truth.ned_pos_m + pos_noise), &self.start_lla);
        let alt_wgs84_m = lla.z as f32;

        GnssData {
            healthy: true,
            new_data: true,
            fix: if num_sats >= MIN_FIX_SATS {
                GnssFix::Fix3d
            } else {
                GnssFix::None
            },
            num_sats,
            lat_rad: lla.x,
            lon_rad: lla.y,
            alt_wgs84_m,
            alt_msl_m: alt_wgs84_m - self.trajectory.geoid_height_m,
            horz_acc_m: self.gnss_horz_acc_m,
            vert_acc_m: 1.5 * self.gnss_horz_acc_m,
            ned_vel_mps: truth.ned_vel_mps + sample3(&self.noise.gnss_vel, rng),
        }
    }
}
