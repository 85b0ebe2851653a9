//! Short-horizon geographic spread forecasting.
//!
//! Produces one prediction per horizon (1, 2, 3 hours). The probability
//! is a bounded base draw scaled by a density multiplier (large matched
//! population) and a heat multiplier (heat-stroke cases), capped at 95.
//!
//! Zone selection is a placeholder behind the signal strategy; real
//! zone assignment would come from spatial clustering of the matched
//! locations. Contributing factors are recorded as explanatory metadata
//! only and do not feed the probability.

use chrono::{DateTime, Utc};

use crate::sampling::ForecastSignals;
use crate::types::{Case, CaseType, ContributingFactors, DensityTrend, RiskLevel, SpreadPrediction};

/// Named forecast zone.
#[derive(Debug, Clone, Copy)]
pub struct Zone {
    pub id: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

pub const ZONES: [Zone; 3] = [
    Zone {
        id: "ZONE-A",
        name: "North District",
        lat: 24.7241,
        lng: 46.6789,
    },
    Zone {
        id: "ZONE-B",
        name: "East Quarter",
        lat: 24.7136,
        lng: 46.6853,
    },
    Zone {
        id: "ZONE-C",
        name: "Central Plaza",
        lat: 24.7050,
        lng: 46.6700,
    },
];

pub const FORECAST_HORIZONS_HOURS: [u8; 3] = [1, 2, 3];
pub const PROBABILITY_CAP_PCT: f64 = 95.0;

/// Multiplier applied when the matched population exceeds this size.
const DENSITY_FACTOR_MIN_MATCHED: usize = 5;
const DENSITY_FACTOR: f64 = 1.2;
const HEAT_FACTOR: f64 = 1.3;

/// Classify a spread probability. Thresholds: above 75 critical, above
/// 60 high, above 40 medium, else low.
pub fn spread_risk_level(probability_pct: f64) -> RiskLevel {
    if probability_pct > 75.0 {
        RiskLevel::Critical
    } else if probability_pct > 60.0 {
        RiskLevel::High
    } else if probability_pct > 40.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Generate the three-horizon spread forecast for a case.
pub fn forecast_spread(
    case: &Case,
    matched_count: usize,
    signals: &dyn ForecastSignals,
    now: DateTime<Utc>,
) -> Vec<SpreadPrediction> {
    let density_factor = if matched_count > DENSITY_FACTOR_MIN_MATCHED {
        DENSITY_FACTOR
    } else {
        1.0
    };
    let heat_factor = if case.case_type == CaseType::HeatStroke {
        HEAT_FACTOR
    } else {
        1.0
    };

    FORECAST_HORIZONS_HOURS
        .iter()
        .map(|&hours| {
            let zone = ZONES[signals.zone_index(ZONES.len()) % ZONES.len()];
            let base = signals.base_probability_pct();
            let probability = (base * density_factor * heat_factor).min(PROBABILITY_CAP_PCT);

            let env = signals.environment();
            let contributing_factors = ContributingFactors {
                density_trend: if matched_count > DENSITY_FACTOR_MIN_MATCHED {
                    DensityTrend::Increasing
                } else {
                    DensityTrend::Stable
                },
                time_overlap_pct: env.time_overlap_pct,
                heat_index_c: env.heat_index_c,
                humidity_pct: env.humidity_pct,
                wind_speed_kph: env.wind_speed_kph,
                crowd_movement: env.crowd_movement,
            };

            SpreadPrediction {
                case_id: case.id.clone(),
                prediction_time: now,
                forecast_hours: hours,
                zone_id: zone.id.to_string(),
                zone_name: zone.name.to_string(),
                probability_pct: probability.round() as u32,
                risk_level: spread_risk_level(probability),
                contributing_factors,
                gps_lat: zone.lat,
                gps_lng: zone.lng,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::EnvironmentSample;
    use crate::types::{CaseStatus, CrowdMovement, Severity};
    use chrono::TimeZone;

    struct Pinned {
        base: f64,
        zone: usize,
    }

    impl ForecastSignals for Pinned {
        fn base_probability_pct(&self) -> f64 {
            self.base
        }
        fn zone_index(&self, _zone_count: usize) -> usize {
            self.zone
        }
        fn environment(&self) -> EnvironmentSample {
            EnvironmentSample {
                heat_index_c: 42.0,
                humidity_pct: 55.0,
                wind_speed_kph: 12.0,
                time_overlap_pct: 25.0,
                crowd_movement: CrowdMovement::Dispersing,
            }
        }
    }

    fn case(case_type: CaseType) -> Case {
        Case {
            id: "case-1".to_string(),
            hospital_id: "H-01".to_string(),
            case_type,
            confirmed: true,
            abnormal_cluster: false,
            severity: Severity::High,
            suspected_source_id: Some("GATE-7".to_string()),
            suspected_source_name: None,
            event_time: Utc.with_ymd_and_hms(2026, 7, 14, 12, 0, 0).unwrap(),
            patient_count: 4,
            status: CaseStatus::Processing,
            gps_lat: None,
            gps_lng: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 14, 13, 0, 0).unwrap()
    }

    #[test]
    fn test_one_prediction_per_horizon() {
        let signals = Pinned { base: 50.0, zone: 1 };
        let predictions = forecast_spread(&case(CaseType::Other), 3, &signals, now());
        let horizons: Vec<u8> = predictions.iter().map(|p| p.forecast_hours).collect();
        assert_eq!(horizons, vec![1, 2, 3]);
        assert!(predictions.iter().all(|p| p.zone_id == "ZONE-B"));
    }

    #[test]
    fn test_probability_capped_at_95_under_both_multipliers() {
        // 80 * 1.2 * 1.3 = 124.8, must clamp to the cap
        let signals = Pinned { base: 80.0, zone: 0 };
        let predictions = forecast_spread(&case(CaseType::HeatStroke), 10, &signals, now());
        for p in &predictions {
            assert_eq!(p.probability_pct, 95, "probability must never exceed the cap");
            assert_eq!(p.risk_level, RiskLevel::Critical);
        }
    }

    #[test]
    fn test_multipliers_apply_only_when_triggered() {
        // Small matched population, non-heat case: base passes through
        let signals = Pinned { base: 50.0, zone: 0 };
        let predictions = forecast_spread(&case(CaseType::FoodPoisoning), 3, &signals, now());
        assert_eq!(predictions[0].probability_pct, 50);

        // Density multiplier alone: 50 * 1.2 = 60
        let predictions = forecast_spread(&case(CaseType::FoodPoisoning), 6, &signals, now());
        assert_eq!(predictions[0].probability_pct, 60);

        // Heat multiplier alone: 50 * 1.3 = 65
        let predictions = forecast_spread(&case(CaseType::HeatStroke), 3, &signals, now());
        assert_eq!(predictions[0].probability_pct, 65);
    }

    #[test]
    fn test_spread_risk_thresholds() {
        assert_eq!(spread_risk_level(40.0), RiskLevel::Low);
        assert_eq!(spread_risk_level(40.1), RiskLevel::Medium);
        assert_eq!(spread_risk_level(60.0), RiskLevel::Medium);
        assert_eq!(spread_risk_level(60.1), RiskLevel::High);
        assert_eq!(spread_risk_level(75.0), RiskLevel::High);
        assert_eq!(spread_risk_level(75.1), RiskLevel::Critical);
    }

    #[test]
    fn test_density_trend_tracks_matched_population() {
        let signals = Pinned { base: 50.0, zone: 2 };
        let small = forecast_spread(&case(CaseType::Other), 5, &signals, now());
        assert_eq!(
            small[0].contributing_factors.density_trend,
            DensityTrend::Stable
        );

        let large = forecast_spread(&case(CaseType::Other), 6, &signals, now());
        assert_eq!(
            large[0].contributing_factors.density_trend,
            DensityTrend::Increasing
        );
    }
}
