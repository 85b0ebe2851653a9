//! Injectable strategies for the signals the pipeline cannot measure yet.
//!
//! Proximity, crowd density, single-check-in dwell time, forecast draws
//! and zone selection are all stand-ins for real sensor and geospatial
//! feeds. They sit behind traits so a real measurement pipeline can be
//! plugged in without touching the scoring or forecast math; the default
//! implementation simulates them with bounded random draws.

use rand::RngExt;

use crate::types::CrowdMovement;

/// Per-uid exposure inputs the upstream sensor layer supplies.
pub trait ExposureSignals: Send + Sync {
    /// Proximity to the suspected source in meters, 0-200.
    fn distance_from_source_m(&self, uid: &str) -> f64;

    /// Ambient crowd density at the matched time, as a percentage.
    fn crowd_intensity_pct(&self, uid: &str) -> f64;

    /// Dwell estimate for uids with a single check-in, in minutes.
    /// Single check-ins cannot measure dwell time; scores built from
    /// this value are flagged as estimated.
    fn single_touch_duration_min(&self, uid: &str) -> f64;
}

/// Raw environmental sample attached to a spread forecast.
#[derive(Debug, Clone)]
pub struct EnvironmentSample {
    pub heat_index_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_kph: f64,
    pub time_overlap_pct: f64,
    pub crowd_movement: CrowdMovement,
}

/// Inputs for the spread forecaster that are not derived from the case.
pub trait ForecastSignals: Send + Sync {
    /// Base probability of spread before multipliers, in [30, 80].
    fn base_probability_pct(&self) -> f64;

    /// Zone selection for a forecast horizon. Placeholder for spatial
    /// clustering of the matched locations; returns an index into the
    /// zone table.
    fn zone_index(&self, zone_count: usize) -> usize;

    fn environment(&self) -> EnvironmentSample;
}

/// Default strategy: bounded random draws matching the ranges the
/// dashboard simulation uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSignals;

impl ExposureSignals for SimulatedSignals {
    fn distance_from_source_m(&self, _uid: &str) -> f64 {
        rand::rng().random_range(0..200) as f64
    }

    fn crowd_intensity_pct(&self, _uid: &str) -> f64 {
        rand::rng().random_range(40..90) as f64
    }

    fn single_touch_duration_min(&self, _uid: &str) -> f64 {
        rand::rng().random_range(15.0..45.0)
    }
}

impl ForecastSignals for SimulatedSignals {
    fn base_probability_pct(&self) -> f64 {
        rand::rng().random_range(30.0..80.0)
    }

    fn zone_index(&self, zone_count: usize) -> usize {
        rand::rng().random_range(0..zone_count)
    }

    fn environment(&self) -> EnvironmentSample {
        let mut rng = rand::rng();
        let crowd_movement = match rng.random_range(0..3) {
            0 => CrowdMovement::Northward,
            1 => CrowdMovement::Southward,
            _ => CrowdMovement::Dispersing,
        };
        EnvironmentSample {
            heat_index_c: rng.random_range(35.0..50.0),
            humidity_pct: rng.random_range(30.0..80.0),
            wind_speed_kph: rng.random_range(5.0..20.0),
            time_overlap_pct: rng.random_range(0.0..50.0_f64).round(),
            crowd_movement,
        }
    }
}
