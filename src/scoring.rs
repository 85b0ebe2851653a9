//! Per-uid exposure scoring.
//!
//! Combines three sub-scores into a weighted composite in [0, 100]:
//! - duration: dwell time at the source, saturating at 60 minutes
//! - distance: linear decay from 100 at the source to 0 at 200m
//! - density: ambient crowd intensity, passed through
//!
//! The composite drives the risk level and notification priority. Pure
//! given the signal strategy; no side effects.

use crate::sampling::ExposureSignals;
use crate::types::{Case, LocationRecord, NotificationPriority, RiskLevel, RiskScore, Severity};

pub const DURATION_WEIGHT: f64 = 0.40;
pub const DISTANCE_WEIGHT: f64 = 0.35;
pub const DENSITY_WEIGHT: f64 = 0.25;

/// Dwell time at which the duration sub-score saturates at 100.
const DURATION_SATURATION_MINUTES: f64 = 60.0;
/// Distance at which the distance sub-score decays to 0.
const DISTANCE_CUTOFF_METERS: f64 = 200.0;

/// Risk factor tags surfaced on the score record.
pub const FACTOR_EXTENDED_EXPOSURE: &str = "Extended exposure";
pub const FACTOR_CLOSE_PROXIMITY: &str = "Close proximity";
pub const FACTOR_HIGH_CROWD_DENSITY: &str = "High crowd density";
pub const FACTOR_HIGH_SEVERITY_CASE: &str = "High severity case";

/// Classify a composite exposure score. Thresholds: below 40 low,
/// 40-60 medium, 60-80 high, 80 and above critical.
pub fn risk_level_for(exposure_intensity_score: f64) -> RiskLevel {
    if exposure_intensity_score >= 80.0 {
        RiskLevel::Critical
    } else if exposure_intensity_score >= 60.0 {
        RiskLevel::High
    } else if exposure_intensity_score >= 40.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Score one matched uid from its qualifying touchpoints.
///
/// Dwell time is measured as the span between the earliest and latest
/// touchpoint when the uid checked in more than once; a single check-in
/// falls back to the strategy's bounded estimate and the score is
/// flagged `duration_estimated`.
pub fn score_exposure(
    case: &Case,
    uid: &str,
    touchpoints: &[&LocationRecord],
    signals: &dyn ExposureSignals,
) -> RiskScore {
    let timestamps: Vec<i64> = touchpoints.iter().map(|t| t.timestamp.timestamp()).collect();

    let (duration_minutes, duration_estimated) = match (timestamps.iter().min(), timestamps.iter().max()) {
        (Some(min), Some(max)) if timestamps.len() > 1 => ((max - min) as f64 / 60.0, false),
        _ => (signals.single_touch_duration_min(uid), true),
    };

    let distance_meters = signals.distance_from_source_m(uid);
    let crowd_intensity_pct = signals.crowd_intensity_pct(uid);

    let duration_score =
        (duration_minutes / DURATION_SATURATION_MINUTES * 100.0).min(100.0);
    let distance_score = (100.0 - distance_meters / (DISTANCE_CUTOFF_METERS / 100.0)).max(0.0);
    let density_score = crowd_intensity_pct;

    let exposure_intensity_score = duration_score * DURATION_WEIGHT
        + distance_score * DISTANCE_WEIGHT
        + density_score * DENSITY_WEIGHT;

    let risk_level = risk_level_for(exposure_intensity_score);

    let mut risk_factors = Vec::new();
    if duration_minutes > 30.0 {
        risk_factors.push(FACTOR_EXTENDED_EXPOSURE.to_string());
    }
    if distance_meters < 50.0 {
        risk_factors.push(FACTOR_CLOSE_PROXIMITY.to_string());
    }
    if crowd_intensity_pct > 70.0 {
        risk_factors.push(FACTOR_HIGH_CROWD_DENSITY.to_string());
    }
    if matches!(case.severity, Severity::High | Severity::Critical) {
        risk_factors.push(FACTOR_HIGH_SEVERITY_CASE.to_string());
    }

    RiskScore {
        case_id: case.id.clone(),
        uid: uid.to_string(),
        duration_minutes: duration_minutes.round(),
        duration_estimated,
        distance_meters,
        crowd_intensity_pct,
        duration_score,
        distance_score,
        density_score,
        exposure_intensity_score,
        risk_level,
        notification_priority: NotificationPriority::from(risk_level),
        risk_factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaseStatus, CaseType};
    use chrono::{TimeZone, Utc};

    /// Deterministic signal strategy for scoring tests.
    struct Pinned {
        distance_m: f64,
        crowd_pct: f64,
        single_touch_min: f64,
    }

    impl ExposureSignals for Pinned {
        fn distance_from_source_m(&self, _uid: &str) -> f64 {
            self.distance_m
        }
        fn crowd_intensity_pct(&self, _uid: &str) -> f64 {
            self.crowd_pct
        }
        fn single_touch_duration_min(&self, _uid: &str) -> f64 {
            self.single_touch_min
        }
    }

    fn case(severity: Severity) -> Case {
        Case {
            id: "case-1".to_string(),
            hospital_id: "H-01".to_string(),
            case_type: CaseType::FoodPoisoning,
            confirmed: true,
            abnormal_cluster: false,
            severity,
            suspected_source_id: Some("REST-001".to_string()),
            suspected_source_name: Some("Al Noor Restaurant".to_string()),
            event_time: Utc.with_ymd_and_hms(2026, 7, 14, 12, 0, 0).unwrap(),
            patient_count: 3,
            status: CaseStatus::PendingCheck,
            gps_lat: None,
            gps_lng: None,
        }
    }

    fn touchpoint(minute_offset: i64) -> LocationRecord {
        LocationRecord {
            id: format!("loc-{}", minute_offset),
            uid: "A".to_string(),
            location_id: "REST-001".to_string(),
            location_name: None,
            timestamp: Utc.with_ymd_and_hms(2026, 7, 14, 12, 0, 0).unwrap()
                + chrono::Duration::minutes(minute_offset),
            lat: 24.7,
            lng: 46.6,
        }
    }

    #[test]
    fn test_risk_level_thresholds_exact() {
        assert_eq!(risk_level_for(0.0), RiskLevel::Low);
        assert_eq!(risk_level_for(39.999), RiskLevel::Low);
        assert_eq!(risk_level_for(40.0), RiskLevel::Medium);
        assert_eq!(risk_level_for(59.999), RiskLevel::Medium);
        assert_eq!(risk_level_for(60.0), RiskLevel::High);
        assert_eq!(risk_level_for(79.999), RiskLevel::High);
        assert_eq!(risk_level_for(80.0), RiskLevel::Critical);
        assert_eq!(risk_level_for(100.0), RiskLevel::Critical);
    }

    #[test]
    fn test_measured_duration_from_touchpoint_span() {
        let a = touchpoint(0);
        let b = touchpoint(50);
        let signals = Pinned {
            distance_m: 10.0,
            crowd_pct: 80.0,
            single_touch_min: 20.0,
        };

        let score = score_exposure(&case(Severity::High), "A", &[&a, &b], &signals);
        assert_eq!(score.duration_minutes, 50.0);
        assert!(!score.duration_estimated);
        // 50/60*100 = 83.33 -> *0.40 = 33.33; distance 95 -> 33.25; density 80 -> 20
        assert!(
            (score.exposure_intensity_score - 86.58).abs() < 0.01,
            "composite should be ~86.58, got {}",
            score.exposure_intensity_score
        );
        assert_eq!(score.risk_level, RiskLevel::Critical);
        assert_eq!(score.notification_priority, NotificationPriority::Critical);
    }

    #[test]
    fn test_single_touchpoint_uses_estimate_and_flags_it() {
        let a = touchpoint(0);
        let signals = Pinned {
            distance_m: 190.0,
            crowd_pct: 20.0,
            single_touch_min: 20.0,
        };

        let score = score_exposure(&case(Severity::Low), "A", &[&a], &signals);
        assert!(score.duration_estimated);
        assert_eq!(score.duration_minutes, 20.0);
        // 20/60*100 = 33.33 -> 13.33; distance 5 -> 1.75; density 20 -> 5
        assert!(
            (score.exposure_intensity_score - 20.08).abs() < 0.01,
            "composite should be ~20.08, got {}",
            score.exposure_intensity_score
        );
        assert_eq!(score.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_duration_score_saturates_at_sixty_minutes() {
        let a = touchpoint(0);
        let b = touchpoint(240);
        let signals = Pinned {
            distance_m: 200.0,
            crowd_pct: 0.0,
            single_touch_min: 20.0,
        };

        let score = score_exposure(&case(Severity::Low), "A", &[&a, &b], &signals);
        assert_eq!(score.duration_score, 100.0);
        assert_eq!(score.distance_score, 0.0);
        assert_eq!(score.exposure_intensity_score, 40.0);
        assert_eq!(score.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_composite_stays_in_bounds() {
        let a = touchpoint(0);
        let b = touchpoint(600);
        let signals = Pinned {
            distance_m: 0.0,
            crowd_pct: 100.0,
            single_touch_min: 45.0,
        };
        let score = score_exposure(&case(Severity::Critical), "A", &[&a, &b], &signals);
        assert!(score.exposure_intensity_score <= 100.0);
        assert!(score.exposure_intensity_score >= 0.0);
        assert_eq!(score.exposure_intensity_score, 100.0);
    }

    #[test]
    fn test_risk_factor_tags() {
        let a = touchpoint(0);
        let b = touchpoint(40);
        let signals = Pinned {
            distance_m: 30.0,
            crowd_pct: 85.0,
            single_touch_min: 20.0,
        };

        let score = score_exposure(&case(Severity::Critical), "A", &[&a, &b], &signals);
        assert!(score.risk_factors.contains(&FACTOR_EXTENDED_EXPOSURE.to_string()));
        assert!(score.risk_factors.contains(&FACTOR_CLOSE_PROXIMITY.to_string()));
        assert!(score.risk_factors.contains(&FACTOR_HIGH_CROWD_DENSITY.to_string()));
        assert!(score.risk_factors.contains(&FACTOR_HIGH_SEVERITY_CASE.to_string()));

        // None of the tags apply at short, distant, sparse exposure
        let signals = Pinned {
            distance_m: 150.0,
            crowd_pct: 30.0,
            single_touch_min: 16.0,
        };
        let score = score_exposure(&case(Severity::Low), "A", &[&a], &signals);
        assert!(score.risk_factors.is_empty(), "got {:?}", score.risk_factors);
    }

    #[test]
    fn test_duration_span_ignores_touchpoint_order() {
        let a = touchpoint(50);
        let b = touchpoint(0);
        let signals = Pinned {
            distance_m: 100.0,
            crowd_pct: 50.0,
            single_touch_min: 20.0,
        };
        let score = score_exposure(&case(Severity::Low), "A", &[&a, &b], &signals);
        assert_eq!(score.duration_minutes, 50.0);
    }
}
