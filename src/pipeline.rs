//! Case pipeline orchestrator.
//!
//! Sequences the danger check against a case's lifecycle state:
//! match the location pool, score each matched uid, forecast spread,
//! compose and dispatch alerts, then advance the case to
//! `alerts_generated`. Per-uid work is best-effort: failures are logged
//! and counted, never propagated, and the summary reports both sides.
//!
//! Runs for the same case are serialized through a per-case lock; a run
//! cancelled mid-flight leaves the case in `processing` so operators
//! can detect and retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::alerts;
use crate::config::Config;
use crate::error::PipelineError;
use crate::forecast;
use crate::matcher;
use crate::notify::{DispatchRequest, DispatchStatus, NotificationGateway};
use crate::routing::{self, HazardZone};
use crate::sampling::{ExposureSignals, ForecastSignals};
use crate::scoring;
use crate::store::{Store, StoreError};
use crate::types::{AlertRecord, AlertStatus, Case, CaseStatus, LocationRecord};

/// Outcome of one danger-check run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Unique uids co-located with the source.
    pub matched: usize,
    /// Risk scores written.
    pub scored: usize,
    /// Per-uid or per-record failures absorbed during fan-out.
    pub failed: usize,
    /// Alerts confirmed delivered by the gateway.
    pub alerts_sent: usize,
}

/// Half-span in degrees of the hazard box built around a case's source
/// coordinates for crowd rerouting.
const HAZARD_HALF_SPAN_DEG: f64 = 0.01;

pub struct Pipeline {
    store: Arc<dyn Store>,
    gateway: Arc<dyn NotificationGateway>,
    exposure_signals: Arc<dyn ExposureSignals>,
    forecast_signals: Arc<dyn ForecastSignals>,
    config: Config,
    case_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn NotificationGateway>,
        exposure_signals: Arc<dyn ExposureSignals>,
        forecast_signals: Arc<dyn ForecastSignals>,
        config: Config,
    ) -> Self {
        Pipeline {
            store,
            gateway,
            exposure_signals,
            forecast_signals,
            config,
            case_locks: DashMap::new(),
        }
    }

    /// Run the full danger check for a case.
    ///
    /// Allowed from `pending_check`, and from `processing` as an
    /// operator retry after a cancelled run (scores upsert and matched
    /// exposures are unique per uid, so the retry does not duplicate
    /// derived rows). Terminal states and `alerts_generated` reject.
    pub async fn run_danger_check(&self, case_id: &str) -> Result<RunSummary, PipelineError> {
        let case = self.load_case(case_id).await?;
        case.validate().map_err(PipelineError::InvalidCase)?;

        // Serialize runs per case; re-read state once the lock is held
        // in case a concurrent run just finished.
        let lock = self
            .case_locks
            .entry(case.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let case = self.store.get_case(case_id).await?;
        if !matches!(case.status, CaseStatus::PendingCheck | CaseStatus::Processing) {
            return Err(PipelineError::InvalidTransition { from: case.status });
        }

        // Unconfirmed, no abnormal cluster: nothing to do, ever.
        if case.status == CaseStatus::PendingCheck && !case.needs_check() {
            log::info!(
                "Case {}: not confirmed and no symptom cluster, no alert needed",
                case.id
            );
            self.store
                .update_case_status(&case.id, CaseStatus::NoAlertNeeded)
                .await?;
            return Ok(RunSummary::default());
        }

        self.store
            .update_case_status(&case.id, CaseStatus::Processing)
            .await?;
        log::info!("Case {}: danger check started", case.id);

        let mut summary = RunSummary::default();
        let pool = self.store.list_locations().await?;
        let window_hours = self.config.exposure_window_hours;

        // Stage 1: co-location matching
        let exposures = matcher::match_exposures(&case, &pool, window_hours);
        for exposure in &exposures {
            if let Err(e) = self.store.create_matched_exposure(exposure.clone()).await {
                log::warn!("Case {}: failed to record exposure for {}: {}", case.id, exposure.uid, e);
                summary.failed += 1;
            }
        }
        let exposures = self.store.list_matched_exposures(&case.id).await?;
        summary.matched = exposures.len();
        log::info!(
            "Case {}: {} uid(s) matched at {}",
            case.id,
            summary.matched,
            case.source_label()
        );

        // Stage 2: per-uid risk scoring
        let touchpoints = touchpoints_by_uid(&case, &pool, window_hours);
        for exposure in &exposures {
            let records = touchpoints
                .get(exposure.uid.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let score =
                scoring::score_exposure(&case, &exposure.uid, records, &*self.exposure_signals);
            match self.store.upsert_risk_score(score).await {
                Ok(()) => summary.scored += 1,
                Err(e) => {
                    log::warn!("Case {}: scoring write failed for {}: {}", case.id, exposure.uid, e);
                    summary.failed += 1;
                }
            }
        }

        // Stage 3: spread forecast, one prediction per horizon
        let predictions = forecast::forecast_spread(
            &case,
            summary.matched,
            &*self.forecast_signals,
            Utc::now(),
        );
        for prediction in predictions {
            if let Err(e) = self.store.create_spread_prediction(prediction).await {
                log::warn!("Case {}: failed to store spread prediction: {}", case.id, e);
                summary.failed += 1;
            }
        }

        // Stage 4: crowd rerouting advisory for dense heat-stroke matches
        if alerts::crowd_alert_applies(case.case_type, summary.matched) {
            let hazard = match (case.gps_lat, case.gps_lng) {
                (Some(lat), Some(lng)) => Some(HazardZone::around(lat, lng, HAZARD_HALF_SPAN_DEG)),
                _ => None,
            };
            let diversion = routing::divert_around(hazard.as_ref());
            let crowd_alert = alerts::compose_crowd_alert(
                &case,
                summary.matched,
                diversion.affected_routes,
                diversion.recommended_route,
                Utc::now(),
            );
            match self.store.create_crowd_alert(crowd_alert).await {
                Ok(()) => log::info!("Case {}: crowd rerouting alert issued", case.id),
                Err(e) => {
                    log::warn!("Case {}: failed to store crowd alert: {}", case.id, e);
                    summary.failed += 1;
                }
            }
        }

        // Stage 5: authority alert per the routing table
        if let Some(alert) = alerts::compose_authority_alert(&case, Utc::now()) {
            match self.dispatch_alert(&case, alert).await {
                Ok(true) => summary.alerts_sent += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    log::warn!("Case {}: authority alert failed: {}", case.id, e);
                    summary.failed += 1;
                }
            }
        }

        // Stage 6: risk-tiered user notifications
        let scores = self.store.list_risk_scores(&case.id).await?;
        for exposure in &exposures {
            let risk = scores.iter().find(|s| s.uid == exposure.uid);
            let alert = alerts::compose_user_alert(&case, &exposure.uid, risk, Utc::now());
            match self.dispatch_alert(&case, alert).await {
                Ok(true) => {
                    summary.alerts_sent += 1;
                    if let Err(e) = self
                        .store
                        .mark_notification_sent(&case.id, &exposure.uid)
                        .await
                    {
                        log::warn!(
                            "Case {}: failed to flag delivery for {}: {}",
                            case.id,
                            exposure.uid,
                            e
                        );
                    }
                }
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    log::warn!("Case {}: user alert failed for {}: {}", case.id, exposure.uid, e);
                    summary.failed += 1;
                }
            }
        }

        self.store
            .update_case_status(&case.id, CaseStatus::AlertsGenerated)
            .await?;
        log::info!(
            "Case {}: danger check complete ({} matched, {} scored, {} failed, {} alerts sent)",
            case.id,
            summary.matched,
            summary.scored,
            summary.failed,
            summary.alerts_sent
        );

        Ok(summary)
    }

    /// Explicit close: `alerts_generated -> closed`. No computation.
    pub async fn close_case(&self, case_id: &str) -> Result<(), PipelineError> {
        let case = self.load_case(case_id).await?;
        if case.status != CaseStatus::AlertsGenerated {
            return Err(PipelineError::InvalidTransition { from: case.status });
        }
        self.store
            .update_case_status(case_id, CaseStatus::Closed)
            .await?;
        log::info!("Case {}: closed", case_id);
        Ok(())
    }

    async fn load_case(&self, case_id: &str) -> Result<Case, PipelineError> {
        match self.store.get_case(case_id).await {
            Ok(case) => Ok(case),
            Err(StoreError::NotFound { .. }) => {
                Err(PipelineError::CaseNotFound(case_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store the alert, push it through the gateway under the configured
    /// timeout, and record the delivery outcome on the record. Delivery
    /// failure (including timeout) is recorded as `failed` status, never
    /// raised. Returns whether the alert was delivered.
    async fn dispatch_alert(
        &self,
        case: &Case,
        alert: AlertRecord,
    ) -> Result<bool, PipelineError> {
        let alert_id = alert.id.clone();
        let request = DispatchRequest {
            case_id: case.id.clone(),
            target: alert.target.clone(),
            message: alert.message.clone(),
            severity: alert.severity,
        };
        self.store.create_alert(alert).await?;

        let timeout = Duration::from_secs(self.config.dispatch_timeout_secs);
        let status = match tokio::time::timeout(timeout, self.gateway.dispatch(&request)).await {
            Ok(outcome) if outcome.status == DispatchStatus::Sent => AlertStatus::Sent,
            Ok(outcome) => {
                log::warn!(
                    "Case {}: dispatch to {} failed: {}",
                    case.id,
                    request.target,
                    outcome.detail.as_deref().unwrap_or("unknown")
                );
                AlertStatus::Failed
            }
            Err(_) => {
                log::warn!(
                    "Case {}: dispatch to {} timed out after {}s",
                    case.id,
                    request.target,
                    self.config.dispatch_timeout_secs
                );
                AlertStatus::Failed
            }
        };

        self.store.set_alert_status(&alert_id, status).await?;
        Ok(status == AlertStatus::Sent)
    }
}

/// Group each uid's qualifying touchpoints for dwell-time measurement.
fn touchpoints_by_uid<'a>(
    case: &Case,
    pool: &'a [LocationRecord],
    window_hours: i64,
) -> HashMap<&'a str, Vec<&'a LocationRecord>> {
    let mut by_uid: HashMap<&str, Vec<&LocationRecord>> = HashMap::new();
    for record in matcher::qualifying_records(case, pool, window_hours) {
        by_uid.entry(record.uid.as_str()).or_default().push(record);
    }
    by_uid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{DispatchOutcome, SimulatedGateway};
    use crate::sampling::EnvironmentSample;
    use crate::store::MemoryStore;
    use crate::types::{
        AlertType, CaseType, CrowdMovement, RiskLevel, Severity, TargetType,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    /// Deterministic per-uid signal profiles: (distance_m, crowd_pct,
    /// single_touch_min).
    struct TestSignals {
        profiles: HashMap<String, (f64, f64, f64)>,
    }

    impl TestSignals {
        fn new(profiles: &[(&str, f64, f64, f64)]) -> Self {
            TestSignals {
                profiles: profiles
                    .iter()
                    .map(|&(uid, d, c, m)| (uid.to_string(), (d, c, m)))
                    .collect(),
            }
        }

        fn profile(&self, uid: &str) -> (f64, f64, f64) {
            self.profiles.get(uid).copied().unwrap_or((100.0, 50.0, 20.0))
        }
    }

    impl ExposureSignals for TestSignals {
        fn distance_from_source_m(&self, uid: &str) -> f64 {
            self.profile(uid).0
        }
        fn crowd_intensity_pct(&self, uid: &str) -> f64 {
            self.profile(uid).1
        }
        fn single_touch_duration_min(&self, uid: &str) -> f64 {
            self.profile(uid).2
        }
    }

    impl ForecastSignals for TestSignals {
        fn base_probability_pct(&self) -> f64 {
            50.0
        }
        fn zone_index(&self, _zone_count: usize) -> usize {
            0
        }
        fn environment(&self) -> EnvironmentSample {
            EnvironmentSample {
                heat_index_c: 40.0,
                humidity_pct: 50.0,
                wind_speed_kph: 10.0,
                time_overlap_pct: 20.0,
                crowd_movement: CrowdMovement::Dispersing,
            }
        }
    }

    /// Gateway whose transport always fails.
    struct FailingGateway;

    #[async_trait]
    impl NotificationGateway for FailingGateway {
        async fn dispatch(&self, _request: &DispatchRequest) -> DispatchOutcome {
            DispatchOutcome::failed("simulated transport outage")
        }
    }

    fn event_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 14, 12, 0, 0).unwrap()
    }

    fn case(id: &str, case_type: CaseType, confirmed: bool, cluster: bool) -> Case {
        Case {
            id: id.to_string(),
            hospital_id: "H-01".to_string(),
            case_type,
            confirmed,
            abnormal_cluster: cluster,
            severity: Severity::High,
            suspected_source_id: Some("REST-001".to_string()),
            suspected_source_name: Some("Al Noor Restaurant".to_string()),
            event_time: event_time(),
            patient_count: 3,
            status: CaseStatus::PendingCheck,
            gps_lat: None,
            gps_lng: None,
        }
    }

    fn record(uid: &str, location_id: &str, minute_offset: i64) -> LocationRecord {
        LocationRecord {
            id: format!("loc-{}-{}", uid, minute_offset),
            uid: uid.to_string(),
            location_id: location_id.to_string(),
            location_name: None,
            timestamp: event_time() + chrono::Duration::minutes(minute_offset),
            lat: 24.7,
            lng: 46.6,
        }
    }

    fn pipeline_with(
        store: Arc<MemoryStore>,
        gateway: Arc<dyn NotificationGateway>,
        signals: TestSignals,
    ) -> Pipeline {
        let signals = Arc::new(signals);
        Pipeline::new(
            store,
            gateway,
            signals.clone(),
            signals,
            Config::default(),
        )
    }

    #[tokio::test]
    async fn test_unconfirmed_case_short_circuits_to_no_alert_needed() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_case(case("c1", CaseType::FoodPoisoning, false, false))
            .await
            .unwrap();
        store
            .ingest_location(record("A", "REST-001", 10))
            .await
            .unwrap();

        let pipeline = pipeline_with(
            store.clone(),
            Arc::new(SimulatedGateway),
            TestSignals::new(&[]),
        );
        let summary = pipeline.run_danger_check("c1").await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(
            store.get_case("c1").await.unwrap().status,
            CaseStatus::NoAlertNeeded
        );
        assert!(store.list_matched_exposures("c1").await.unwrap().is_empty());
        assert!(store.list_risk_scores("c1").await.unwrap().is_empty());
        assert!(store.list_alerts("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_food_poisoning_scenario() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_case(case("c1", CaseType::FoodPoisoning, true, false))
            .await
            .unwrap();
        // A: two touchpoints 50 minutes apart; B: single touchpoint;
        // C: unrelated location
        for rec in [
            record("A", "REST-001", 0),
            record("A", "REST-001", 50),
            record("B", "REST-001", 120),
            record("C", "CAFE-009", 10),
        ] {
            store.ingest_location(rec).await.unwrap();
        }

        let signals = TestSignals::new(&[
            ("A", 10.0, 80.0, 20.0),
            ("B", 190.0, 20.0, 20.0),
        ]);
        let pipeline = pipeline_with(store.clone(), Arc::new(SimulatedGateway), signals);
        let summary = pipeline.run_danger_check("c1").await.unwrap();

        assert_eq!(summary.matched, 2);
        assert_eq!(summary.scored, 2);
        assert_eq!(summary.failed, 0);
        // one authority alert + two user notifications
        assert_eq!(summary.alerts_sent, 3);

        let scores = store.list_risk_scores("c1").await.unwrap();
        let a = scores.iter().find(|s| s.uid == "A").unwrap();
        assert!(
            matches!(a.risk_level, RiskLevel::High | RiskLevel::Critical),
            "uid A should be high or critical, got {:?}",
            a.risk_level
        );
        assert!(!a.duration_estimated);
        assert_eq!(a.duration_minutes, 50.0);

        let b = scores.iter().find(|s| s.uid == "B").unwrap();
        assert_eq!(b.risk_level, RiskLevel::Low);
        assert!(b.duration_estimated);

        let alerts = store.list_alerts("c1").await.unwrap();
        let authority: Vec<_> = alerts
            .iter()
            .filter(|a| a.alert_type == AlertType::AuthorityAlert)
            .collect();
        assert_eq!(authority.len(), 1);
        assert_eq!(authority[0].target, alerts::RESTAURANT_AUTHORITY_TARGET);
        assert_eq!(authority[0].target_type, TargetType::RestaurantAuthority);
        assert_eq!(authority[0].status, AlertStatus::Sent);

        let user: Vec<_> = alerts
            .iter()
            .filter(|a| a.alert_type == AlertType::UserNotification)
            .collect();
        assert_eq!(user.len(), 2);
        assert!(user.iter().all(|a| a.status == AlertStatus::Sent));

        // high-tier message embeds duration and risk level
        let a_alert = user.iter().find(|a| a.target == "A").unwrap();
        assert!(a_alert.message.contains("50 min"));
        assert!(a_alert.message.contains("CRITICAL") || a_alert.message.contains("HIGH"));

        assert_eq!(
            store.get_case("c1").await.unwrap().status,
            CaseStatus::AlertsGenerated
        );
        let exposures = store.list_matched_exposures("c1").await.unwrap();
        assert!(exposures.iter().all(|e| e.notification_sent));

        assert_eq!(store.list_spread_predictions("c1").await.unwrap().len(), 3);
        // no crowd alert for food poisoning
        assert!(store.list_crowd_alerts("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rerun_rejected_after_alerts_generated_and_close() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_case(case("c1", CaseType::FoodPoisoning, true, false))
            .await
            .unwrap();
        store
            .ingest_location(record("A", "REST-001", 5))
            .await
            .unwrap();

        let pipeline = pipeline_with(
            store.clone(),
            Arc::new(SimulatedGateway),
            TestSignals::new(&[]),
        );
        pipeline.run_danger_check("c1").await.unwrap();

        let err = pipeline.run_danger_check("c1").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                from: CaseStatus::AlertsGenerated
            }
        ));

        pipeline.close_case("c1").await.unwrap();
        assert_eq!(store.get_case("c1").await.unwrap().status, CaseStatus::Closed);

        let err = pipeline.run_danger_check("c1").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                from: CaseStatus::Closed
            }
        ));
        // closing twice is also rejected
        assert!(pipeline.close_case("c1").await.is_err());
    }

    #[tokio::test]
    async fn test_close_requires_alerts_generated() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_case(case("c1", CaseType::Other, true, false))
            .await
            .unwrap();

        let pipeline = pipeline_with(
            store.clone(),
            Arc::new(SimulatedGateway),
            TestSignals::new(&[]),
        );
        let err = pipeline.close_case("c1").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                from: CaseStatus::PendingCheck
            }
        ));
    }

    #[tokio::test]
    async fn test_retry_from_processing_does_not_duplicate_rows() {
        let store = Arc::new(MemoryStore::new());
        let mut c = case("c1", CaseType::FoodPoisoning, true, false);
        // Simulate a run cancelled mid-flight: status stuck in
        // processing with some derived rows already written
        c.status = CaseStatus::Processing;
        store.create_case(c).await.unwrap();
        store
            .ingest_location(record("A", "REST-001", 5))
            .await
            .unwrap();
        store
            .create_matched_exposure(crate::types::MatchedExposure {
                case_id: "c1".to_string(),
                uid: "A".to_string(),
                matched_location_id: "REST-001".to_string(),
                matched_location_name: None,
                matched_timestamp: event_time(),
                notification_sent: false,
            })
            .await
            .unwrap();

        let pipeline = pipeline_with(
            store.clone(),
            Arc::new(SimulatedGateway),
            TestSignals::new(&[("A", 50.0, 60.0, 25.0)]),
        );
        let summary = pipeline.run_danger_check("c1").await.unwrap();

        assert_eq!(summary.matched, 1);
        assert_eq!(store.list_matched_exposures("c1").await.unwrap().len(), 1);
        assert_eq!(
            store.list_risk_scores("c1").await.unwrap().len(),
            1,
            "retry must not duplicate score rows"
        );
        assert_eq!(
            store.get_case("c1").await.unwrap().status,
            CaseStatus::AlertsGenerated
        );
    }

    #[tokio::test]
    async fn test_concurrent_runs_for_same_case_are_serialized() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_case(case("c1", CaseType::FoodPoisoning, true, false))
            .await
            .unwrap();
        store
            .ingest_location(record("A", "REST-001", 5))
            .await
            .unwrap();

        let pipeline = Arc::new(pipeline_with(
            store.clone(),
            Arc::new(SimulatedGateway),
            TestSignals::new(&[]),
        ));

        let first = tokio::spawn({
            let p = pipeline.clone();
            async move { p.run_danger_check("c1").await }
        });
        let second = tokio::spawn({
            let p = pipeline.clone();
            async move { p.run_danger_check("c1").await }
        });
        let results = [first.await.unwrap(), second.await.unwrap()];

        // One run wins; the other observes the terminal state under the
        // lock and is rejected. Derived rows are written exactly once.
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(store.list_matched_exposures("c1").await.unwrap().len(), 1);
        assert_eq!(store.list_risk_scores("c1").await.unwrap().len(), 1);
        assert_eq!(
            store.get_case("c1").await.unwrap().status,
            CaseStatus::AlertsGenerated
        );
    }

    #[tokio::test]
    async fn test_crowd_alert_fires_only_above_threshold() {
        for (uid_count, expect_alert) in [(5usize, false), (6usize, true)] {
            let store = Arc::new(MemoryStore::new());
            let mut c = case("c1", CaseType::HeatStroke, true, false);
            c.suspected_source_id = Some("GATE-7".to_string());
            c.suspected_source_name = Some("Gate 7 Plaza".to_string());
            c.gps_lat = Some(24.705);
            c.gps_lng = Some(46.69);
            store.create_case(c).await.unwrap();

            for i in 0..uid_count {
                store
                    .ingest_location(record(&format!("u{}", i), "GATE-7", i as i64))
                    .await
                    .unwrap();
            }

            let pipeline = pipeline_with(
                store.clone(),
                Arc::new(SimulatedGateway),
                TestSignals::new(&[]),
            );
            let summary = pipeline.run_danger_check("c1").await.unwrap();
            assert_eq!(summary.matched, uid_count);

            let crowd_alerts = store.list_crowd_alerts("c1").await.unwrap();
            if expect_alert {
                assert_eq!(crowd_alerts.len(), 1, "6 matched uids must trigger rerouting");
                let alert = &crowd_alerts[0];
                // Hazard box around Gate 7 closes Routes A and C
                assert_eq!(
                    alert.affected_routes,
                    vec!["Route A".to_string(), "Route C".to_string()]
                );
                assert_eq!(alert.recommended_route.as_deref(), Some("Route B"));
            } else {
                assert!(crowd_alerts.is_empty(), "5 matched uids must not trigger rerouting");
            }

            // heat-stroke cases alert EMS either way
            let alerts = store.list_alerts("c1").await.unwrap();
            let authority: Vec<_> = alerts
                .iter()
                .filter(|a| a.alert_type == AlertType::AuthorityAlert)
                .collect();
            assert_eq!(authority.len(), 1);
            assert_eq!(authority[0].target, alerts::RED_CRESCENT_TARGET);
        }
    }

    #[tokio::test]
    async fn test_failed_dispatch_recorded_not_raised() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_case(case("c1", CaseType::FoodPoisoning, true, false))
            .await
            .unwrap();
        store
            .ingest_location(record("A", "REST-001", 5))
            .await
            .unwrap();

        let pipeline = pipeline_with(
            store.clone(),
            Arc::new(FailingGateway),
            TestSignals::new(&[]),
        );
        let summary = pipeline.run_danger_check("c1").await.unwrap();

        assert_eq!(summary.alerts_sent, 0);
        // authority + user dispatch both failed
        assert_eq!(summary.failed, 2);

        let alerts = store.list_alerts("c1").await.unwrap();
        assert_eq!(alerts.len(), 2, "audit trail keeps failed alerts");
        assert!(alerts.iter().all(|a| a.status == AlertStatus::Failed));

        // the run still completes; delivery failure is not a run failure
        assert_eq!(
            store.get_case("c1").await.unwrap().status,
            CaseStatus::AlertsGenerated
        );
        let exposures = store.list_matched_exposures("c1").await.unwrap();
        assert!(exposures.iter().all(|e| !e.notification_sent));
    }

    #[tokio::test]
    async fn test_missing_source_id_matches_nothing_but_completes() {
        let store = Arc::new(MemoryStore::new());
        let mut c = case("c1", CaseType::FoodPoisoning, true, false);
        c.suspected_source_id = None;
        c.suspected_source_name = None;
        store.create_case(c).await.unwrap();
        store
            .ingest_location(record("A", "REST-001", 5))
            .await
            .unwrap();

        let pipeline = pipeline_with(
            store.clone(),
            Arc::new(SimulatedGateway),
            TestSignals::new(&[]),
        );
        let summary = pipeline.run_danger_check("c1").await.unwrap();

        assert_eq!(summary.matched, 0);
        assert_eq!(summary.scored, 0);
        // authority alert still goes out for the confirmed case
        assert_eq!(summary.alerts_sent, 1);
        assert_eq!(
            store.get_case("c1").await.unwrap().status,
            CaseStatus::AlertsGenerated
        );
    }
}
