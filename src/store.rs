//! Storage port and the in-memory adapter.
//!
//! The pipeline reads and writes through the `Store` trait only; the
//! hosted data platform sits behind the same surface in production.
//! `MemoryStore` backs tests and the demo binary. Collections are
//! append-only except case status, matched-exposure delivery flags and
//! alert status.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

use crate::types::{
    AlertRecord, AlertStatus, Case, CaseStatus, CrowdAlert, LocationRecord, MatchedExposure,
    RiskScore, SpreadPrediction,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} not found: {id}")]
    NotFound { collection: &'static str, id: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_case(&self, case: Case) -> Result<(), StoreError>;
    async fn get_case(&self, case_id: &str) -> Result<Case, StoreError>;
    async fn update_case_status(&self, case_id: &str, status: CaseStatus)
        -> Result<(), StoreError>;

    async fn ingest_location(&self, record: LocationRecord) -> Result<(), StoreError>;
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, StoreError>;

    /// Create a matched exposure unless one already exists for the
    /// (case_id, uid) pair. Returns true when a row was created.
    async fn create_matched_exposure(&self, exposure: MatchedExposure)
        -> Result<bool, StoreError>;
    async fn list_matched_exposures(&self, case_id: &str)
        -> Result<Vec<MatchedExposure>, StoreError>;
    async fn mark_notification_sent(&self, case_id: &str, uid: &str) -> Result<(), StoreError>;

    /// Insert or deterministically overwrite the score for (case_id, uid).
    async fn upsert_risk_score(&self, score: RiskScore) -> Result<(), StoreError>;
    async fn list_risk_scores(&self, case_id: &str) -> Result<Vec<RiskScore>, StoreError>;

    async fn create_spread_prediction(&self, prediction: SpreadPrediction)
        -> Result<(), StoreError>;
    async fn list_spread_predictions(&self, case_id: &str)
        -> Result<Vec<SpreadPrediction>, StoreError>;

    async fn create_alert(&self, alert: AlertRecord) -> Result<(), StoreError>;
    async fn set_alert_status(&self, alert_id: &str, status: AlertStatus)
        -> Result<(), StoreError>;
    async fn list_alerts(&self, case_id: &str) -> Result<Vec<AlertRecord>, StoreError>;

    async fn create_crowd_alert(&self, alert: CrowdAlert) -> Result<(), StoreError>;
    async fn list_crowd_alerts(&self, case_id: &str) -> Result<Vec<CrowdAlert>, StoreError>;
}

/// In-memory store for tests and the demo runner.
#[derive(Default)]
pub struct MemoryStore {
    cases: RwLock<HashMap<String, Case>>,
    locations: RwLock<Vec<LocationRecord>>,
    exposures: RwLock<Vec<MatchedExposure>>,
    risk_scores: RwLock<Vec<RiskScore>>,
    predictions: RwLock<Vec<SpreadPrediction>>,
    alerts: RwLock<Vec<AlertRecord>>,
    crowd_alerts: RwLock<Vec<CrowdAlert>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_case(&self, case: Case) -> Result<(), StoreError> {
        self.cases.write().insert(case.id.clone(), case);
        Ok(())
    }

    async fn get_case(&self, case_id: &str) -> Result<Case, StoreError> {
        self.cases
            .read()
            .get(case_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: "case",
                id: case_id.to_string(),
            })
    }

    async fn update_case_status(
        &self,
        case_id: &str,
        status: CaseStatus,
    ) -> Result<(), StoreError> {
        let mut cases = self.cases.write();
        let case = cases.get_mut(case_id).ok_or_else(|| StoreError::NotFound {
            collection: "case",
            id: case_id.to_string(),
        })?;
        case.status = status;
        Ok(())
    }

    async fn ingest_location(&self, record: LocationRecord) -> Result<(), StoreError> {
        self.locations.write().push(record);
        Ok(())
    }

    async fn list_locations(&self) -> Result<Vec<LocationRecord>, StoreError> {
        Ok(self.locations.read().clone())
    }

    async fn create_matched_exposure(
        &self,
        exposure: MatchedExposure,
    ) -> Result<bool, StoreError> {
        let mut exposures = self.exposures.write();
        let exists = exposures
            .iter()
            .any(|e| e.case_id == exposure.case_id && e.uid == exposure.uid);
        if exists {
            return Ok(false);
        }
        exposures.push(exposure);
        Ok(true)
    }

    async fn list_matched_exposures(
        &self,
        case_id: &str,
    ) -> Result<Vec<MatchedExposure>, StoreError> {
        Ok(self
            .exposures
            .read()
            .iter()
            .filter(|e| e.case_id == case_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_sent(&self, case_id: &str, uid: &str) -> Result<(), StoreError> {
        let mut exposures = self.exposures.write();
        let exposure = exposures
            .iter_mut()
            .find(|e| e.case_id == case_id && e.uid == uid)
            .ok_or_else(|| StoreError::NotFound {
                collection: "matched_exposure",
                id: format!("{}/{}", case_id, uid),
            })?;
        exposure.notification_sent = true;
        Ok(())
    }

    async fn upsert_risk_score(&self, score: RiskScore) -> Result<(), StoreError> {
        let mut scores = self.risk_scores.write();
        match scores
            .iter_mut()
            .find(|s| s.case_id == score.case_id && s.uid == score.uid)
        {
            Some(existing) => *existing = score,
            None => scores.push(score),
        }
        Ok(())
    }

    async fn list_risk_scores(&self, case_id: &str) -> Result<Vec<RiskScore>, StoreError> {
        Ok(self
            .risk_scores
            .read()
            .iter()
            .filter(|s| s.case_id == case_id)
            .cloned()
            .collect())
    }

    async fn create_spread_prediction(
        &self,
        prediction: SpreadPrediction,
    ) -> Result<(), StoreError> {
        self.predictions.write().push(prediction);
        Ok(())
    }

    async fn list_spread_predictions(
        &self,
        case_id: &str,
    ) -> Result<Vec<SpreadPrediction>, StoreError> {
        Ok(self
            .predictions
            .read()
            .iter()
            .filter(|p| p.case_id == case_id)
            .cloned()
            .collect())
    }

    async fn create_alert(&self, alert: AlertRecord) -> Result<(), StoreError> {
        self.alerts.write().push(alert);
        Ok(())
    }

    async fn set_alert_status(
        &self,
        alert_id: &str,
        status: AlertStatus,
    ) -> Result<(), StoreError> {
        let mut alerts = self.alerts.write();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| StoreError::NotFound {
                collection: "alert",
                id: alert_id.to_string(),
            })?;
        alert.status = status;
        Ok(())
    }

    async fn list_alerts(&self, case_id: &str) -> Result<Vec<AlertRecord>, StoreError> {
        Ok(self
            .alerts
            .read()
            .iter()
            .filter(|a| a.case_id == case_id)
            .cloned()
            .collect())
    }

    async fn create_crowd_alert(&self, alert: CrowdAlert) -> Result<(), StoreError> {
        self.crowd_alerts.write().push(alert);
        Ok(())
    }

    async fn list_crowd_alerts(&self, case_id: &str) -> Result<Vec<CrowdAlert>, StoreError> {
        Ok(self
            .crowd_alerts
            .read()
            .iter()
            .filter(|a| a.linked_case_id == case_id)
            .cloned()
            .collect())
    }
}
