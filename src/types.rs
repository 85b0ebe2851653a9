//! Core domain records for the exposure pipeline.
//!
//! Case types, severities, risk levels and statuses are closed enums with
//! `snake_case` wire names so stored records stay compatible with the
//! dashboard's JSON shapes. All derived records (matched exposures, risk
//! scores, spread predictions, alert log entries) live here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a reported incident. Drives authority routing and the
/// heat factor in spread forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    HeatStroke,
    FoodPoisoning,
    RespiratoryIllness,
    WaterborneDisease,
    Other,
}

impl CaseType {
    /// Human-readable label used in notification message text.
    pub fn label(&self) -> &'static str {
        match self {
            CaseType::HeatStroke => "heat stroke",
            CaseType::FoodPoisoning => "food poisoning",
            CaseType::RespiratoryIllness => "respiratory illness",
            CaseType::WaterborneDisease => "waterborne disease",
            CaseType::Other => "health incident",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of a case. Transitions are monotone forward-only:
/// `pending_check -> {no_alert_needed | processing -> alerts_generated -> closed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    PendingCheck,
    NoAlertNeeded,
    Processing,
    AlertsGenerated,
    Closed,
}

impl CaseStatus {
    /// Terminal states accept no further pipeline runs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::NoAlertNeeded | CaseStatus::Closed)
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CaseStatus::PendingCheck => "pending_check",
            CaseStatus::NoAlertNeeded => "no_alert_needed",
            CaseStatus::Processing => "processing",
            CaseStatus::AlertsGenerated => "alerts_generated",
            CaseStatus::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// A hospital-reported incident. Created by external intake; only the
/// orchestrator mutates it (status transitions), and it is never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub hospital_id: String,
    pub case_type: CaseType,
    pub confirmed: bool,
    pub abnormal_cluster: bool,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspected_source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspected_source_name: Option<String>,
    pub event_time: DateTime<Utc>,
    pub patient_count: u32,
    pub status: CaseStatus,
    /// Source coordinates, when the intake form provided them. Used to
    /// build the hazard zone for crowd rerouting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_lng: Option<f64>,
}

impl Case {
    /// Display label for the suspected source: name if present, else id.
    pub fn source_label(&self) -> &str {
        self.suspected_source_name
            .as_deref()
            .or(self.suspected_source_id.as_deref())
            .unwrap_or("an unidentified location")
    }

    /// Whether the danger check should run at all. Unconfirmed cases with
    /// no abnormal symptom cluster go straight to `no_alert_needed`.
    pub fn needs_check(&self) -> bool {
        self.confirmed || self.abnormal_cluster
    }

    /// Reject malformed intake before any pipeline stage runs.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("case id is empty".to_string());
        }
        if self.hospital_id.trim().is_empty() {
            return Err("hospital_id is empty".to_string());
        }
        if self.patient_count < 1 {
            return Err("patient_count must be at least 1".to_string());
        }
        Ok(())
    }
}

/// An anonymized location check-in. Immutable and append-only; ownership
/// belongs to the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: String,
    /// Opaque anonymized identifier, never tied to PII.
    pub uid: String,
    pub location_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
}

impl LocationRecord {
    /// Build a record from raw ingestion input, enforcing data
    /// minimization: uid must be non-empty, coordinates must be in
    /// bounds, and a missing location_id falls back to a coordinate
    /// bucket of the form `LOC_{lat:.4}_{lng:.4}`.
    pub fn sanitized(
        uid: &str,
        lat: f64,
        lng: f64,
        location_id: Option<String>,
        location_name: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, String> {
        if uid.trim().is_empty() {
            return Err("missing required field: uid".to_string());
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(format!("invalid GPS coordinates: {}, {}", lat, lng));
        }

        let location_id = location_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("LOC_{:.4}_{:.4}", lat, lng));

        Ok(LocationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            uid: uid.to_string(),
            location_id,
            location_name,
            timestamp,
            lat,
            lng,
        })
    }
}

/// A uid identified as co-located with a case's suspected source.
/// At most one per (case_id, uid) pair per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedExposure {
    pub case_id: String,
    pub uid: String,
    pub matched_location_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_location_name: Option<String>,
    pub matched_timestamp: DateTime<Utc>,
    pub notification_sent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// Downstream urgency tier, derived 1:1 from the risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Advisory,
    Standard,
    Urgent,
    Critical,
}

impl From<RiskLevel> for NotificationPriority {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => NotificationPriority::Advisory,
            RiskLevel::Medium => NotificationPriority::Standard,
            RiskLevel::High => NotificationPriority::Urgent,
            RiskLevel::Critical => NotificationPriority::Critical,
        }
    }
}

/// Per-uid exposure score for a case. One per (case_id, uid); re-scoring
/// overwrites deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    pub case_id: String,
    pub uid: String,
    /// Dwell time at the source, rounded to whole minutes.
    pub duration_minutes: f64,
    /// True when the dwell time came from the single-touchpoint estimate
    /// rather than a measured span between check-ins.
    pub duration_estimated: bool,
    pub distance_meters: f64,
    pub crowd_intensity_pct: f64,
    pub duration_score: f64,
    pub distance_score: f64,
    pub density_score: f64,
    /// Weighted composite in [0, 100].
    pub exposure_intensity_score: f64,
    pub risk_level: RiskLevel,
    pub notification_priority: NotificationPriority,
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityTrend {
    Increasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrowdMovement {
    Northward,
    Southward,
    Dispersing,
}

/// Environmental context attached to a spread prediction. Explanatory
/// metadata only: these values are stored alongside the forecast but do
/// not feed back into the probability computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributingFactors {
    pub density_trend: DensityTrend,
    pub time_overlap_pct: f64,
    pub heat_index_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_kph: f64,
    pub crowd_movement: CrowdMovement,
}

/// Short-horizon probabilistic forecast of which zone risk may spread to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadPrediction {
    pub case_id: String,
    pub prediction_time: DateTime<Utc>,
    /// Forecast horizon: 1, 2 or 3 hours out.
    pub forecast_hours: u8,
    pub zone_id: String,
    pub zone_name: String,
    /// Probability of spread into the zone, 0-100, capped at 95.
    pub probability_pct: u32,
    pub risk_level: RiskLevel,
    pub contributing_factors: ContributingFactors,
    pub gps_lat: f64,
    pub gps_lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    AuthorityAlert,
    UserNotification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    RedCrescent,
    RestaurantAuthority,
    Hospital,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Sent,
    Failed,
}

/// Append-only alert audit log entry. Only `status` may change after
/// creation (pending -> sent|failed), so the trail stays complete even
/// when delivery fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub case_id: String,
    pub alert_type: AlertType,
    pub target: String,
    pub target_type: TargetType,
    pub message: String,
    pub status: AlertStatus,
    pub case_type: CaseType,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// Role groups that receive crowd rerouting alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrowdRecipient {
    CrowdSupervisors,
    Volunteers,
    FieldControl,
    Ems,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrowdAlertStatus {
    Active,
    Resolved,
}

/// Crowd diversion advisory, issued when a heat-stroke case matches a
/// large exposed population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrowdAlert {
    pub id: String,
    pub alert_time: DateTime<Utc>,
    pub alert_type: String,
    pub affected_routes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_route: Option<String>,
    pub severity: Severity,
    pub message: String,
    pub target_recipients: Vec<CrowdRecipient>,
    pub status: CrowdAlertStatus,
    pub linked_case_id: String,
}
