//! Alert composition: authority alerts, risk-tiered user notifications,
//! and crowd rerouting advisories.
//!
//! Composers build records in `pending` status; the orchestrator owns
//! dispatch and the sent/failed transition. One record per invocation,
//! no internal retry.

use chrono::{DateTime, Utc};

use crate::types::{
    AlertRecord, AlertStatus, AlertType, Case, CaseType, CrowdAlert, CrowdAlertStatus,
    CrowdRecipient, RiskLevel, RiskScore, TargetType,
};

pub const RED_CRESCENT_TARGET: &str = "Red Crescent / EMS";
pub const RESTAURANT_AUTHORITY_TARGET: &str = "Restaurant Regulatory Authority";

/// A heat-stroke case only triggers crowd rerouting when the matched
/// population is strictly larger than this.
pub const CROWD_ALERT_MATCHED_THRESHOLD: usize = 5;

/// Authority routing table. Heat stroke goes to EMS, food poisoning to
/// the restaurant regulator; other case types produce no authority
/// alert by policy. Extend this match when onboarding new authorities.
pub fn compose_authority_alert(case: &Case, now: DateTime<Utc>) -> Option<AlertRecord> {
    let (target, target_type, message) = match case.case_type {
        CaseType::HeatStroke => (
            RED_CRESCENT_TARGET,
            TargetType::RedCrescent,
            format!(
                "HEAT STROKE ALERT: {} patient(s) reported at {}. Severity: {}. Event time: {}",
                case.patient_count,
                case.source_label(),
                case.severity,
                case.event_time.format("%Y-%m-%d %H:%M UTC"),
            ),
        ),
        CaseType::FoodPoisoning => (
            RESTAURANT_AUTHORITY_TARGET,
            TargetType::RestaurantAuthority,
            format!(
                "FOOD POISONING ALERT: {} case(s) linked to {}. Immediate inspection recommended. Severity: {}",
                case.patient_count,
                case.source_label(),
                case.severity,
            ),
        ),
        _ => return None,
    };

    Some(AlertRecord {
        id: uuid::Uuid::new_v4().to_string(),
        case_id: case.id.clone(),
        alert_type: AlertType::AuthorityAlert,
        target: target.to_string(),
        target_type,
        message,
        status: AlertStatus::Pending,
        case_type: case.case_type,
        severity: case.severity,
        created_at: now,
    })
}

/// Compose the notification for one exposed uid. Message tier follows
/// the uid's risk level; a missing score falls back to the generic
/// informational notice.
pub fn compose_user_alert(
    case: &Case,
    uid: &str,
    risk: Option<&RiskScore>,
    now: DateTime<Utc>,
) -> AlertRecord {
    let message = match risk {
        Some(score) => match score.risk_level {
            RiskLevel::Critical | RiskLevel::High => format!(
                "HIGH RISK ALERT: Your exposure level is {} due to an extended stay \
                 ({} min) in a high-density zone. You may have been exposed to {} at {}. \
                 Please seek medical attention and monitor for symptoms immediately.",
                score.risk_level.to_string().to_uppercase(),
                score.duration_minutes,
                case.case_type.label(),
                case.source_label(),
            ),
            RiskLevel::Medium => format!(
                "HEALTH ALERT: You may have been exposed to {} at {} on {}. \
                 Your exposure risk is MEDIUM ({} min at the location). \
                 Please monitor for symptoms and follow health guidelines.",
                case.case_type.label(),
                case.source_label(),
                case.event_time.format("%Y-%m-%d"),
                score.duration_minutes,
            ),
            RiskLevel::Low => format!(
                "ADVISORY: You were near a reported {} incident at {}. \
                 Your risk level is LOW. Stay informed and monitor for symptoms as a precaution.",
                case.case_type.label(),
                case.source_label(),
            ),
        },
        None => format!(
            "HEALTH ALERT: You may have been exposed to {} at {} on {}. \
             Please monitor for symptoms and follow health guidelines.",
            case.case_type.label(),
            case.source_label(),
            case.event_time.format("%Y-%m-%d"),
        ),
    };

    AlertRecord {
        id: uuid::Uuid::new_v4().to_string(),
        case_id: case.id.clone(),
        alert_type: AlertType::UserNotification,
        target: uid.to_string(),
        target_type: TargetType::User,
        message,
        status: AlertStatus::Pending,
        case_type: case.case_type,
        severity: case.severity,
        created_at: now,
    }
}

/// Whether the case warrants a crowd rerouting advisory.
pub fn crowd_alert_applies(case_type: CaseType, matched_count: usize) -> bool {
    case_type == CaseType::HeatStroke && matched_count > CROWD_ALERT_MATCHED_THRESHOLD
}

/// Compose the crowd rerouting advisory for supervisors and field teams.
pub fn compose_crowd_alert(
    case: &Case,
    matched_count: usize,
    affected_routes: Vec<String>,
    recommended_route: Option<String>,
    now: DateTime<Utc>,
) -> CrowdAlert {
    let message = format!(
        "Heat stress detected at {}. High density with {} affected individuals. \
         Recommend diverting crowds to alternative routes.",
        case.source_label(),
        matched_count,
    );

    CrowdAlert {
        id: uuid::Uuid::new_v4().to_string(),
        alert_time: now,
        alert_type: "heat_stress".to_string(),
        affected_routes,
        recommended_route,
        severity: case.severity,
        message,
        target_recipients: vec![
            CrowdRecipient::CrowdSupervisors,
            CrowdRecipient::Volunteers,
            CrowdRecipient::FieldControl,
            CrowdRecipient::Ems,
        ],
        status: CrowdAlertStatus::Active,
        linked_case_id: case.id.clone(),
    }
}
