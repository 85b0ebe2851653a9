//! Proactive hospital-load outlook.
//!
//! A linear model over temperature and crowd density estimates the
//! near-term case surge for an area; high and moderate outlooks produce
//! a pre-emptive alert to the nearest hospital so capacity can be
//! staged ahead of arrivals.

use chrono::{DateTime, Duration, Utc};

use crate::geo::haversine_distance_m;
use crate::types::{
    AlertRecord, AlertStatus, AlertType, CaseType, Severity, TargetType,
};

/// Linear surge model weights: cases ~ 0.8 * temperature + 1.5 * density.
pub const TEMPERATURE_WEIGHT: f64 = 0.8;
pub const DENSITY_WEIGHT: f64 = 1.5;

/// Predicted surge at or above this triggers a high outlook and a
/// hospital alert.
pub const HOSPITAL_SURGE_ALERT_THRESHOLD: u32 = 15;
/// Above this (and below the alert threshold) the outlook is moderate.
pub const MODERATE_SURGE_THRESHOLD: u32 = 5;

/// How far ahead the outlook looks.
const OUTLOOK_HORIZON_HOURS: i64 = 4;

/// Hospitals eligible for surge alerts, with coordinates.
pub const HOSPITALS: [(&str, f64, f64); 2] = [
    ("Riyadh Central", 24.7000, 46.6800),
    ("East Health Center", 24.7500, 46.7200),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurgeRisk {
    Low,
    Moderate,
    High,
}

impl std::fmt::Display for SurgeRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SurgeRisk::Low => "low",
            SurgeRisk::Moderate => "moderate",
            SurgeRisk::High => "high",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct SurgeOutlook {
    pub area_id: String,
    /// End of the window the prediction covers.
    pub window_end: DateTime<Utc>,
    pub predicted_case_surge: u32,
    pub risk: SurgeRisk,
    /// Nearest hospital to the area; recipient of the surge alert.
    pub hospital_target: String,
}

/// Predicted case increase for the given conditions, never negative.
pub fn predict_case_surge(temperature_c: f64, crowd_density_per_m2: f64) -> u32 {
    let surge = TEMPERATURE_WEIGHT * temperature_c + DENSITY_WEIGHT * crowd_density_per_m2;
    surge.round().max(0.0) as u32
}

fn surge_risk_for(predicted: u32) -> SurgeRisk {
    if predicted >= HOSPITAL_SURGE_ALERT_THRESHOLD {
        SurgeRisk::High
    } else if predicted > MODERATE_SURGE_THRESHOLD {
        SurgeRisk::Moderate
    } else {
        SurgeRisk::Low
    }
}

/// Hospital closest to the area by great-circle distance.
pub fn nearest_hospital(lat: f64, lng: f64) -> &'static str {
    HOSPITALS
        .iter()
        .map(|&(name, h_lat, h_lng)| (name, haversine_distance_m(lat, lng, h_lat, h_lng)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name)
        .unwrap_or(HOSPITALS[0].0)
}

/// Assess the surge outlook for an area under current conditions.
pub fn assess_surge(
    area_id: &str,
    lat: f64,
    lng: f64,
    temperature_c: f64,
    crowd_density_per_m2: f64,
    now: DateTime<Utc>,
) -> SurgeOutlook {
    let predicted = predict_case_surge(temperature_c, crowd_density_per_m2);
    SurgeOutlook {
        area_id: area_id.to_string(),
        window_end: now + Duration::hours(OUTLOOK_HORIZON_HOURS),
        predicted_case_surge: predicted,
        risk: surge_risk_for(predicted),
        hospital_target: nearest_hospital(lat, lng).to_string(),
    }
}

/// Pre-emptive capacity alert for the target hospital. Low outlooks
/// produce none.
pub fn compose_hospital_alert(outlook: &SurgeOutlook, now: DateTime<Utc>) -> Option<AlertRecord> {
    if outlook.risk == SurgeRisk::Low {
        return None;
    }

    let severity = match outlook.risk {
        SurgeRisk::High => Severity::High,
        _ => Severity::Medium,
    };

    Some(AlertRecord {
        id: uuid::Uuid::new_v4().to_string(),
        case_id: outlook.area_id.clone(),
        alert_type: AlertType::AuthorityAlert,
        target: outlook.hospital_target.clone(),
        target_type: TargetType::Hospital,
        message: format!(
            "HOSPITAL SURGE ALERT ({} outlook): expecting an increase of ~{} cases in {} \
             within the next {} hours. Stage capacity accordingly.",
            outlook.risk,
            outlook.predicted_case_surge,
            outlook.area_id,
            OUTLOOK_HORIZON_HOURS,
        ),
        status: AlertStatus::Pending,
        case_type: CaseType::Other,
        severity,
        created_at: now,
    })
}
