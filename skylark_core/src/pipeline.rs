// skylark_core/src/pipeline.rs

//! The per-frame navigation pipeline.
//!
//! A `NavPipeline` owns every piece of navigation state (filter bank, home
//! position, geoid height, the navigation filter itself) and is driven once
//! per frame with the latest sensor snapshot.
//!
//! The time update always integrates over the fixed frame period. Elapsed time
//! is never measured, so a late or missed frame shows up directly as
//! integration error.

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::airdata::{indicated_airspeed_mps, pressure_altitude_m};
use crate::config::{FrameRate, NavConfig};
use crate::error::NavError;
use crate::estimation::NavFilter;
use crate::filters::FilterBank;
use crate::gate::{self, GateDecision, WaitReason};
use crate::messages::{NavData, SensorData};
use crate::output;

/// The GNSS position captured on the initialisation frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HomePosition {
    pub lat_rad: f64,
    pub lon_rad: f64,
    pub alt_wgs84_m: f32,
}

impl HomePosition {
    /// `[lat_rad, lon_rad, alt_wgs84_m]`
    pub fn lla(&self) -> Vector3<f64> {
        Vector3::new(self.lat_rad, self.lon_rad, self.alt_wgs84_m as f64)
    }
}

// --- Internal state machine ---

#[derive(Debug, Clone)]
enum NavState {
    Uninitialized {
        last_wait: Option<WaitReason>,
    },
    Initialized {
        home: HomePosition,
        geoid_height_m: f32,
        bank: FilterBank,
    },
}

// =========================================================================
// == Navigation Pipeline ==
// =========================================================================

pub struct NavPipeline<F: NavFilter> {
    config: NavConfig,
    frame_rate: FrameRate,
    nav_filter: F,
    state: NavState,
}

impl<F: NavFilter> NavPipeline<F> {
    /// Validates the configuration and builds an uninitialised pipeline.
    pub fn new(config: NavConfig, frame_rate: FrameRate, nav_filter: F) -> Result<Self, NavError> {
        config.validate()?;
        config.warn_above_nyquist(frame_rate);

        Ok(Self {
            config,
            frame_rate,
            nav_filter,
            state: NavState::Uninitialized { last_wait: None },
        })
    }

    /// Runs one frame.
    ///
    /// Before initialisation only `nav.nav_initialized` is written. Afterwards
    /// the full solution is published on every frame, re-publishing the last
    /// estimate when no fresh measurement arrived.
    pub fn run(&mut self, sensors: &SensorData, nav: &mut NavData) {
        let just_initialized = match &mut self.state {
            NavState::Uninitialized { last_wait } => match gate::evaluate(sensors) {
                GateDecision::Waiting(reason) => {
                    if *last_wait != Some(reason) {
                        debug!("Navigation waiting: {}", reason);
                        *last_wait = Some(reason);
                    }
                    nav.nav_initialized = false;
                    return;
                }
                GateDecision::Ready => true,
            },
            NavState::Initialized { .. } => false,
        };

        if just_initialized {
            self.initialize(sensors);
        }

        let NavState::Initialized {
            home,
            geoid_height_m,
            bank,
        } = &mut self.state
        else {
            return;
        };

        // The initialisation frame already seeded the filter with these samples.
        if !just_initialized {
            if sensors.imu.new_imu_data {
                self.nav_filter.time_update(
                    &sensors.imu.accel_mps2,
                    &sensors.imu.gyro_radps,
                    self.frame_rate.period_s(),
                );
            }
            if sensors.gnss.new_data {
                self.nav_filter
                    .measurement_update(&sensors.gnss.ned_vel_mps, &sensors.gnss.lla());
            }
        }

        nav.nav_initialized = true;

        // --- Filter estimate ---
        let attitude = self.nav_filter.attitude();
        let lla = self.nav_filter.lla();
        let ned_vel = self.nav_filter.ned_vel();

        nav.accel_bias_mps2 = self.nav_filter.accel_bias();
        nav.gyro_bias_radps = self.nav_filter.gyro_bias();
        nav.roll_rad = attitude.roll_rad;
        nav.pitch_rad = attitude.pitch_rad;
        nav.heading_rad = attitude.yaw_rad;
        nav.lat_rad = lla.x;
        nav.lon_rad = lla.y;
        nav.alt_wgs84_m = lla.z as f32;
        nav.ned_vel_mps = ned_vel;

        // --- Derived quantities ---
        let derived = output::derive(&lla, &ned_vel, &home.lla(), *geoid_height_m);
        nav.alt_msl_m = derived.alt_msl_m;
        nav.ned_pos_m = derived.ned_pos_m;
        nav.alt_rel_m = derived.alt_rel_m;
        nav.gnd_spd_mps = derived.gnd_spd_mps;
        nav.gnd_track_rad = derived.gnd_track_rad;
        nav.flight_path_rad = derived.flight_path_rad;
        nav.home_lat_rad = home.lat_rad;
        nav.home_lon_rad = home.lon_rad;
        nav.home_alt_wgs84_m = home.alt_wgs84_m;

        // --- Filtered sensors ---
        nav.accel_mps2 = bank.filter_accel(&sensors.imu.accel_mps2);
        nav.gyro_radps = bank.filter_gyro(&sensors.imu.gyro_radps);
        nav.mag_ut = if sensors.imu.new_mag_data {
            bank.filter_mag(&sensors.imu.mag_ut)
        } else {
            bank.mag().output()
        };

        // --- Air data ---
        if sensors.static_pres.new_data {
            bank.filter_static_pres(sensors.static_pres.pres_pa);
        }
        nav.static_pres_pa = bank.static_pres().output();
        nav.alt_pres_m = pressure_altitude_m(nav.static_pres_pa);

        if sensors.pitot_static_installed {
            if sensors.diff_pres.new_data {
                bank.filter_diff_pres(sensors.diff_pres.pres_pa);
            }
            if let Some(diff_pres) = bank.diff_pres() {
                nav.diff_pres_pa = diff_pres.output();
                nav.ias_mps = indicated_airspeed_mps(nav.diff_pres_pa);
            }
        }
    }

    fn initialize(&mut self, sensors: &SensorData) {
        let gnss = &sensors.gnss;
        let home = HomePosition {
            lat_rad: gnss.lat_rad,
            lon_rad: gnss.lon_rad,
            alt_wgs84_m: gnss.alt_wgs84_m,
        };
        let geoid_height_m = gnss.alt_wgs84_m - gnss.alt_msl_m;
        let bank = FilterBank::new(&self.config, self.frame_rate, sensors);

        self.nav_filter.initialize(
            &sensors.imu.accel_mps2,
            &sensors.imu.gyro_radps,
            &sensors.imu.mag_ut,
            &gnss.ned_vel_mps,
            &home.lla(),
        );

        info!(
            "Navigation initialised: home {:.7} deg, {:.7} deg, {:.1} m WGS84, geoid {:.1} m, {} satellites",
            home.lat_rad.to_degrees(),
            home.lon_rad.to_degrees(),
            home.alt_wgs84_m,
            geoid_height_m,
            gnss.num_sats
        );

        self.state = NavState::Initialized {
            home,
            geoid_height_m,
            bank,
        };
    }

    // --- Introspection ---

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, NavState::Initialized { .. })
    }

    pub fn home(&self) -> Option<&HomePosition> {
        match &self.state {
            NavState::Initialized { home, .. } => Some(home),
            NavState::Uninitialized { .. } => None,
        }
    }

    pub fn geoid_height_m(&self) -> Option<f32> {
        match &self.state {
            NavState::Initialized { geoid_height_m, .. } => Some(*geoid_height_m),
            NavState::Uninitialized { .. } => None,
        }
    }

    pub fn filter_bank(&self) -> Option<&FilterBank> {
        match &self.state {
            NavState::Initialized { bank, .. } => Some(bank),
            NavState::Uninitialized { .. } => None,
        }
    }

    pub fn nav_filter(&self) -> &F {
        &self.nav_filter
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::Attitude;
    use approx::assert_abs_diff_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Initialize { home: Vector3<f64> },
        TimeUpdate { dt_s: f32 },
        MeasurementUpdate { lla: Vector3<f64> },
    }

    /// Records every call and reports whatever estimate it was given.
    #[derive(Debug, Default)]
    struct ScriptedFilter {
        calls: Vec<Call>,
        attitude: Attitude,
        lla: Vector3<f64>,
        ned_vel: Vector3<f32>,
    }

    impl ScriptedFilter {
        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }
    }

    impl NavFilter for ScriptedFilter {
        fn initialize(
            &mut self,
            _accel: &Vector3<f32>,
            _gyro: &Vector3<f32>,
            _mag: &Vector3<f32>,
            gnss_ned_vel: &Vector3<f32>,
            home_lla: &Vector3<f64>,
        ) {
            self.calls.push(Call::Initialize { home: *home_lla });
            self.lla = *home_lla;
            self.ned_vel = *gnss_ned_vel;
        }

        fn time_update(&mut self, _accel: &Vector3<f32>, _gyro: &Vector3<f32>, dt_s: f32) {
            self.calls.push(Call::TimeUpdate { dt_s });
        }

        fn measurement_update(&mut self, _gnss_ned_vel: &Vector3<f32>, gnss_lla: &Vector3<f64>) {
            self.calls.push(Call::MeasurementUpdate { lla: *gnss_lla });
        }

        fn attitude(&self) -> Attitude {
            self.attitude
        }

        fn lla(&self) -> Vector3<f64> {
            self.lla
        }

        fn ned_vel(&self) -> Vector3<f32> {
            self.ned_vel
        }

        fn accel_bias(&self) -> Vector3<f32> {
            Vector3::new(0.01, 0.02, 0.03)
        }

        fn gyro_bias(&self) -> Vector3<f32> {
            Vector3::new(-0.001, 0.0, 0.001)
        }
    }

    fn pipeline() -> NavPipeline<ScriptedFilter> {
        NavPipeline::new(NavConfig::default(), FrameRate::Hz100, ScriptedFilter::default())
            .expect("default config is valid")
    }

    /// A snapshot with plausible values and every freshness flag cleared.
    fn stale_sensors() -> SensorData {
        let mut s = SensorData {
            pitot_static_installed: true,
            ..SensorData::default()
        };
        s.imu.accel_mps2 = Vector3::new(0.0, 0.0, -9.8);
        s.imu.gyro_radps = Vector3::new(0.0, 0.0, 0.01);
        s.imu.mag_ut = Vector3::new(20.0, 0.0, 45.0);
        s.gnss.num_sats = 14;
        s.gnss.lat_rad = 0.785;
        s.gnss.lon_rad = -1.623;
        s.gnss.alt_wgs84_m = 270.0;
        s.gnss.alt_msl_m = 300.0;
        s.static_pres.pres_pa = 97_000.0;
        s.diff_pres.pres_pa = 120.0;
        s
    }

    fn fresh_sensors() -> SensorData {
        let mut s = stale_sensors();
        s.imu.new_imu_data = true;
        s.imu.new_mag_data = true;
        s.gnss.new_data = true;
        s.static_pres.new_data = true;
        s.diff_pres.new_data = true;
        s
    }

    fn initialized_pipeline() -> (NavPipeline<ScriptedFilter>, NavData) {
        let mut nav_pipeline = pipeline();
        let mut nav = NavData::default();
        nav_pipeline.run(&fresh_sensors(), &mut nav);
        assert!(nav.nav_initialized);
        (nav_pipeline, nav)
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = NavConfig {
            accel_cutoff_hz: -1.0,
            ..NavConfig::default()
        };
        let result = NavPipeline::new(config, FrameRate::Hz100, ScriptedFilter::default());
        assert!(matches!(
            result,
            Err(NavError::InvalidCutoff {
                channel: "accelerometer",
                ..
            })
        ));
    }

    #[test]
    fn test_initializes_on_first_ready_tick() {
        let mut nav_pipeline = pipeline();
        let mut nav = NavData::default();

        // Ticks 1-4: plenty of satellites, but never everything fresh at once.
        let mut ticks: Vec<SensorData> = Vec::new();
        let mut s = stale_sensors();
        s.imu.new_imu_data = true;
        ticks.push(s);
        let mut s = fresh_sensors();
        s.imu.new_mag_data = false;
        ticks.push(s);
        let mut s = fresh_sensors();
        s.gnss.new_data = false;
        ticks.push(s);
        let mut s = fresh_sensors();
        s.diff_pres.new_data = false;
        ticks.push(s);

        for (i, sensors) in ticks.iter().enumerate() {
            nav_pipeline.run(sensors, &mut nav);
            assert!(!nav.nav_initialized, "initialised early on tick {}", i + 1);
            assert!(nav_pipeline.home().is_none());
            assert!(nav_pipeline.filter_bank().is_none());
        }
        assert!(nav_pipeline.nav_filter().calls.is_empty());
        // Nothing but the flag is written before initialisation.
        assert_eq!(
            nav,
            NavData {
                nav_initialized: false,
                ..NavData::default()
            }
        );

        // Tick 5: everything fresh.
        let mut tick5 = fresh_sensors();
        tick5.gnss.lat_rad = 0.7854;
        tick5.gnss.lon_rad = -1.6232;
        tick5.gnss.alt_wgs84_m = 281.5;
        nav_pipeline.run(&tick5, &mut nav);

        assert!(nav.nav_initialized);
        assert_eq!(nav.home_lat_rad, 0.7854);
        assert_eq!(nav.home_lon_rad, -1.6232);
        assert_eq!(nav.home_alt_wgs84_m, 281.5);

        let home = nav_pipeline.home().copied().expect("home is captured");
        assert_eq!(home.lla(), tick5.gnss.lla());
        assert_eq!(
            nav_pipeline.nav_filter().calls,
            vec![Call::Initialize { home: tick5.gnss.lla() }]
        );
    }

    #[test]
    fn test_geoid_height_from_init_fix() {
        let (nav_pipeline, nav) = initialized_pipeline();
        assert_eq!(nav_pipeline.geoid_height_m(), Some(-30.0));
        // Filter estimate sits at home, so MSL altitude matches the fix.
        assert_abs_diff_eq!(nav.alt_msl_m, 300.0, epsilon = 1e-3);
        assert_abs_diff_eq!(nav.alt_rel_m, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_no_updates_on_initialization_tick() {
        let (nav_pipeline, _) = initialized_pipeline();
        let calls = &nav_pipeline.nav_filter().calls;
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], Call::Initialize { .. }));
    }

    #[test]
    fn test_stays_initialized_on_stale_data() {
        let (mut nav_pipeline, mut nav) = initialized_pipeline();
        let home = *nav_pipeline.home().expect("initialised");
        let geoid = nav_pipeline.geoid_height_m();

        let mut moved = stale_sensors();
        moved.gnss.lat_rad += 0.01;
        moved.gnss.alt_msl_m += 50.0;
        for _ in 0..20 {
            nav_pipeline.run(&moved, &mut nav);
            assert!(nav.nav_initialized);
        }

        // A later fresh fix must not move home either.
        moved.gnss.new_data = true;
        nav_pipeline.run(&moved, &mut nav);

        assert_eq!(nav_pipeline.home(), Some(&home));
        assert_eq!(nav_pipeline.geoid_height_m(), geoid);
        assert_eq!(nav.home_lat_rad, home.lat_rad);
        assert_eq!(nav_pipeline.nav_filter().count(|c| matches!(c, Call::TimeUpdate { .. })), 0);
    }

    #[test]
    fn test_updates_follow_fresh_data() {
        let (mut nav_pipeline, mut nav) = initialized_pipeline();

        let mut imu_only = stale_sensors();
        imu_only.imu.new_imu_data = true;
        let mut with_gnss = imu_only;
        with_gnss.gnss.new_data = true;
        with_gnss.gnss.lat_rad = 0.786;

        for tick in 0..10 {
            let sensors = if tick % 5 == 4 { &with_gnss } else { &imu_only };
            nav_pipeline.run(sensors, &mut nav);
        }

        let filter = nav_pipeline.nav_filter();
        assert_eq!(filter.count(|c| matches!(c, Call::TimeUpdate { .. })), 10);
        assert_eq!(
            filter.count(|c| matches!(c, Call::MeasurementUpdate { .. })),
            2
        );
        assert!(filter.calls.contains(&Call::TimeUpdate { dt_s: 0.01 }));
        assert!(filter.calls.contains(&Call::MeasurementUpdate {
            lla: with_gnss.gnss.lla()
        }));
        // Time update runs before the measurement update within a frame.
        assert!(matches!(filter.calls[5], Call::TimeUpdate { .. }));
        assert!(matches!(filter.calls[6], Call::MeasurementUpdate { .. }));
    }

    #[test]
    fn test_time_step_is_frame_period() {
        let mut nav_pipeline =
            NavPipeline::new(NavConfig::default(), FrameRate::Hz50, ScriptedFilter::default())
                .expect("valid");
        let mut nav = NavData::default();
        nav_pipeline.run(&fresh_sensors(), &mut nav);
        nav_pipeline.run(&fresh_sensors(), &mut nav);
        assert_eq!(
            nav_pipeline.nav_filter().calls[1],
            Call::TimeUpdate { dt_s: 0.02 }
        );
    }

    #[test]
    fn test_estimate_is_republished_every_tick() {
        let (mut nav_pipeline, mut nav) = initialized_pipeline();
        nav_pipeline.nav_filter.attitude = Attitude {
            roll_rad: 0.1,
            pitch_rad: 0.05,
            yaw_rad: 1.5,
        };
        nav_pipeline.nav_filter.ned_vel = Vector3::new(0.0, 20.0, -1.0);

        nav_pipeline.run(&stale_sensors(), &mut nav);

        assert_eq!(nav.roll_rad, 0.1);
        assert_eq!(nav.pitch_rad, 0.05);
        assert_eq!(nav.heading_rad, 1.5);
        assert_eq!(nav.accel_bias_mps2, Vector3::new(0.01, 0.02, 0.03));
        assert_eq!(nav.gyro_bias_radps, Vector3::new(-0.001, 0.0, 0.001));
        assert_eq!(nav.ned_vel_mps, Vector3::new(0.0, 20.0, -1.0));
        assert_abs_diff_eq!(nav.gnd_spd_mps, 20.0);
        assert_abs_diff_eq!(nav.gnd_track_rad, std::f32::consts::FRAC_PI_2);
        assert!(nav.flight_path_rad > 0.0);
    }

    #[test]
    fn test_mag_filter_advances_only_on_fresh_mag() {
        let (mut nav_pipeline, mut nav) = initialized_pipeline();
        let seed = stale_sensors().imu.mag_ut;
        assert_eq!(nav.mag_ut, seed);

        let mut s = stale_sensors();
        s.imu.mag_ut = Vector3::new(40.0, 10.0, 30.0);
        for _ in 0..5 {
            nav_pipeline.run(&s, &mut nav);
            assert_eq!(nav.mag_ut, seed);
        }

        s.imu.new_mag_data = true;
        nav_pipeline.run(&s, &mut nav);
        assert!(nav.mag_ut.x > seed.x && nav.mag_ut.x < 40.0);
    }

    #[test]
    fn test_imu_filtered_every_tick() {
        let (mut nav_pipeline, mut nav) = initialized_pipeline();
        let mut s = stale_sensors();
        s.imu.accel_mps2 = Vector3::new(1.0, 0.0, -9.8);
        nav_pipeline.run(&s, &mut nav);
        let first = nav.accel_mps2.x;
        nav_pipeline.run(&s, &mut nav);
        assert!(first > 0.0 && nav.accel_mps2.x > first);
    }

    #[test]
    fn test_air_data_from_filtered_pressure() {
        let (mut nav_pipeline, mut nav) = initialized_pipeline();
        assert_eq!(nav.static_pres_pa, 97_000.0);
        assert_eq!(nav.diff_pres_pa, 120.0);
        assert_abs_diff_eq!(nav.alt_pres_m, pressure_altitude_m(97_000.0));
        assert_abs_diff_eq!(nav.ias_mps, indicated_airspeed_mps(120.0));

        // Stale pressure holds the filtered value.
        let mut s = stale_sensors();
        s.static_pres.pres_pa = 90_000.0;
        nav_pipeline.run(&s, &mut nav);
        assert_eq!(nav.static_pres_pa, 97_000.0);

        s.static_pres.new_data = true;
        nav_pipeline.run(&s, &mut nav);
        assert!(nav.static_pres_pa < 97_000.0);
        assert!(nav.alt_pres_m > pressure_altitude_m(97_000.0));
    }

    #[test]
    fn test_no_airspeed_without_pitot() {
        let mut nav_pipeline = pipeline();
        let mut nav = NavData::default();
        let mut s = fresh_sensors();
        s.pitot_static_installed = false;
        s.diff_pres.new_data = false;

        nav_pipeline.run(&s, &mut nav);

        assert!(nav.nav_initialized);
        assert!(nav_pipeline
            .filter_bank()
            .is_some_and(|bank| bank.diff_pres().is_none()));
        assert_eq!(nav.diff_pres_pa, 0.0);
        assert_eq!(nav.ias_mps, 0.0);
        assert_eq!(nav.static_pres_pa, 97_000.0);
    }

    #[test]
    fn test_airspeed_follows_per_tick_pitot_flag() {
        let (mut nav_pipeline, mut nav) = initialized_pipeline();
        let ias_at_init = nav.ias_mps;
        assert!(ias_at_init > 0.0);

        // Pitot reported absent: differential pressure is neither filtered
        // nor published, even when a fresh sample shows up.
        let mut s = stale_sensors();
        s.pitot_static_installed = false;
        s.diff_pres.new_data = true;
        s.diff_pres.pres_pa = 600.0;
        nav.ias_mps = 0.0;
        nav.diff_pres_pa = 0.0;
        for _ in 0..5 {
            nav_pipeline.run(&s, &mut nav);
        }
        assert_eq!(nav.ias_mps, 0.0);
        assert_eq!(nav.diff_pres_pa, 0.0);
        assert_eq!(
            nav_pipeline
                .filter_bank()
                .and_then(|bank| bank.diff_pres())
                .map(|lpf| lpf.output()),
            Some(120.0)
        );

        s.pitot_static_installed = true;
        nav_pipeline.run(&s, &mut nav);
        assert!(nav.diff_pres_pa > 120.0);
        assert!(nav.ias_mps > ias_at_init);
    }

    #[test]
    fn test_works_through_boxed_filter() {
        let boxed: Box<dyn NavFilter> = Box::new(ScriptedFilter::default());
        let mut nav_pipeline =
            NavPipeline::new(NavConfig::default(), FrameRate::Hz200, boxed).expect("valid");
        let mut nav = NavData::default();
        nav_pipeline.run(&fresh_sensors(), &mut nav);
        assert!(nav_pipeline.is_initialized());
        assert_eq!(nav.lat_rad, fresh_sensors().gnss.lat_rad);
    }
}
