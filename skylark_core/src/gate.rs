// skylark_core/src/gate.rs

//! Startup readiness check for the navigation filter.
//!
//! The filter is only seeded on a frame where every sensor it depends on has
//! delivered a fresh sample at the same time. Until then the pipeline keeps
//! reporting an uninitialised solution; waiting is normal startup latency, not
//! a failure.

use std::fmt;

use crate::messages::SensorData;

/// The GNSS fix must track strictly more satellites than this.
pub const MIN_SATELLITES: u8 = 12;

/// The first unmet precondition found on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    NoImuData,
    NoMagData,
    NoGnssFix,
    TooFewSatellites { have: u8, need: u8 },
    NoStaticPressure,
    NoDiffPressure,
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitReason::NoImuData => write!(f, "no fresh IMU sample"),
            WaitReason::NoMagData => write!(f, "no fresh magnetometer sample"),
            WaitReason::NoGnssFix => write!(f, "no fresh GNSS fix"),
            WaitReason::TooFewSatellites { have, need } => {
                write!(f, "{} satellites, need more than {}", have, need)
            }
            WaitReason::NoStaticPressure => write!(f, "no fresh static pressure"),
            WaitReason::NoDiffPressure => write!(f, "no fresh differential pressure"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Ready,
    Waiting(WaitReason),
}

impl GateDecision {
    pub fn is_ready(&self) -> bool {
        matches!(self, GateDecision::Ready)
    }
}

/// Decides whether this frame's sensor snapshot is enough to start navigating.
///
/// Pure function of the snapshot; it never looks at previous frames.
pub fn evaluate(sensors: &SensorData) -> GateDecision {
    match first_unmet(sensors) {
        Some(reason) => GateDecision::Waiting(reason),
        None => GateDecision::Ready,
    }
}

fn first_unmet(sensors: &SensorData) -> Option<WaitReason> {
    if !sensors.imu.new_imu_data {
        return Some(WaitReason::NoImuData);
    }
    if !sensors.imu.new_mag_data {
        return Some(WaitReason::NoMagData);
    }
    if !sensors.gnss.new_data {
        return Some(WaitReason::NoGnssFix);
    }
    if sensors.gnss.num_sats <= MIN_SATELLITES {
        return Some(WaitReason::TooFewSatellites {
            have: sensors.gnss.num_sats,
            need: MIN_SATELLITES,
        });
    }
    if !sensors.static_pres.new_data {
        return Some(WaitReason::NoStaticPressure);
    }
    if sensors.pitot_static_installed && !sensors.diff_pres.new_data {
        return Some(WaitReason::NoDiffPressure);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_fresh(pitot: bool) -> SensorData {
        let mut sensors = SensorData {
            pitot_static_installed: pitot,
            ..SensorData::default()
        };
        sensors.imu.new_imu_data = true;
        sensors.imu.new_mag_data = true;
        sensors.gnss.new_data = true;
        sensors.gnss.num_sats = 14;
        sensors.static_pres.new_data = true;
        sensors.diff_pres.new_data = true;
        sensors
    }

    #[test]
    fn test_ready_when_everything_is_fresh() {
        assert_eq!(evaluate(&all_fresh(true)), GateDecision::Ready);
        assert_eq!(evaluate(&all_fresh(false)), GateDecision::Ready);
    }

    #[test]
    fn test_default_snapshot_waits_for_imu() {
        assert_eq!(
            evaluate(&SensorData::default()),
            GateDecision::Waiting(WaitReason::NoImuData)
        );
    }

    #[test]
    fn test_each_missing_sample_blocks() {
        let mut s = all_fresh(true);
        s.imu.new_mag_data = false;
        assert_eq!(evaluate(&s), GateDecision::Waiting(WaitReason::NoMagData));

        let mut s = all_fresh(true);
        s.gnss.new_data = false;
        assert_eq!(evaluate(&s), GateDecision::Waiting(WaitReason::NoGnssFix));

        let mut s = all_fresh(true);
        s.static_pres.new_data = false;
        assert_eq!(
            evaluate(&s),
            GateDecision::Waiting(WaitReason::NoStaticPressure)
        );
    }

    #[test]
    fn test_satellite_threshold_is_strict() {
        let mut s = all_fresh(true);
        s.gnss.num_sats = MIN_SATELLITES;
        assert_eq!(
            evaluate(&s),
            GateDecision::Waiting(WaitReason::TooFewSatellites {
                have: 12,
                need: 12
            })
        );

        s.gnss.num_sats = MIN_SATELLITES + 1;
        assert!(evaluate(&s).is_ready());
    }

    #[test]
    fn test_diff_pressure_required_only_with_pitot() {
        let mut s = all_fresh(true);
        s.diff_pres.new_data = false;
        assert_eq!(evaluate(&s), GateDecision::Waiting(WaitReason::NoDiffPressure));

        s.pitot_static_installed = false;
        assert!(evaluate(&s).is_ready());
    }

    #[test]
    fn test_wait_reason_display() {
        let reason = WaitReason::TooFewSatellites { have: 7, need: 12 };
        assert_eq!(reason.to_string(), "7 satellites, need more than 12");
    }
}
