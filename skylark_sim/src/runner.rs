// skylark_sim/src/runner.rs

use std::f32::consts::PI;

use nalgebra::Vector3;
use skylark_core::geodesy::lla_to_ned;
use skylark_core::prelude::*;
use tracing::info;

use crate::error::SimError;
use crate::prng::SimulationRng;
use crate::scenario::ScenarioConfig;
use crate::sensors::SensorSimulator;

/// What a scenario run produced, measured against truth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    /// Simulated time of the frame the pipeline initialised on.
    pub init_time_s: Option<f64>,
    pub final_nav: NavData,
    pub final_pos_error_m: f32,
    pub max_pos_error_m: f32,
    pub final_vel_error_mps: f32,
    pub final_heading_error_rad: f32,
}

/// Wraps an angle into (-pi, pi].
fn wrap_pi(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Runs a scenario end to end with the 15-state EKF as the navigation filter.
pub fn run_scenario(scenario: &ScenarioConfig) -> Result<RunSummary, SimError> {
    scenario.validate()?;

    let frame_rate = scenario.sensors.imu.frame_rate;
    let mut pipeline = NavPipeline::new(scenario.nav, frame_rate, Ekf15State::new(scenario.ekf))?;
    let mut sim = SensorSimulator::new(scenario)?;
    let mut rng = SimulationRng::new(scenario.simulation.seed);

    let hz = frame_rate.hz() as f32;
    let frames = (scenario.simulation.duration_seconds * hz).round() as u64;
    let report_every = (scenario.simulation.report_interval_seconds * hz).round() as u64;

    info!(
        "Running {} frames at {} Hz (pitot-static installed: {})",
        frames,
        frame_rate.hz(),
        scenario.sensors.pitot_static_installed
    );

    let mut nav = NavData::default();
    let mut summary = RunSummary {
        frames,
        init_time_s: None,
        final_nav: nav,
        final_pos_error_m: 0.0,
        max_pos_error_m: 0.0,
        final_vel_error_mps: 0.0,
        final_heading_error_rad: 0.0,
    };

    for frame in 0..frames {
        let sensors = sim.sample(&mut rng);
        pipeline.run(&sensors, &mut nav);

        if nav.nav_initialized {
            let truth = sim.truth();
            summary.init_time_s.get_or_insert(truth.time_s);

            let nav_lla = Vector3::new(nav.lat_rad, nav.lon_rad, nav.alt_wgs84_m as f64);
            let pos_error = lla_to_ned(&nav_lla, &truth.lla).norm() as f32;
            let vel_error = (nav.ned_vel_mps - truth.ned_vel_mps).norm();

            summary.final_pos_error_m = pos_error;
            summary.max_pos_error_m = summary.max_pos_error_m.max(pos_error);
            summary.final_vel_error_mps = vel_error;
            summary.final_heading_error_rad = wrap_pi(nav.heading_rad - truth.heading_rad);

            if report_every > 0 && frame % report_every == 0 {
                info!(
                    "t = {:>6.2} s  pos err {:>6.2} m  vel err {:>5.2} m/s  alt rel {:>7.1} m  gs {:>5.1} m/s  ias {:>5.1} m/s",
                    truth.time_s,
                    pos_error,
                    vel_error,
                    nav.alt_rel_m,
                    nav.gnd_spd_mps,
                    nav.ias_mps
                );
            }
        }

        sim.advance();
    }

    summary.final_nav = nav;
    Ok(summary)
}
