//! Demo runner: seeds the in-memory store with two reported incidents,
//! runs the danger check end to end through the simulated gateway, and
//! prints the summaries. Also exercises the geofence reverse query and
//! the hospital surge outlook.

use std::sync::Arc;

use chrono::{Duration, Utc};

use healthwatch::config;
use healthwatch::geo::{self, GeofenceQuery};
use healthwatch::notify::SimulatedGateway;
use healthwatch::pipeline::Pipeline;
use healthwatch::sampling::SimulatedSignals;
use healthwatch::store::{MemoryStore, Store};
use healthwatch::surge;
use healthwatch::types::{Case, CaseStatus, CaseType, LocationRecord, Severity};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = config::load_config().unwrap_or_else(|e| {
        log::warn!("Using default config: {}", e);
        config::Config::default()
    });

    let store = Arc::new(MemoryStore::new());
    seed_demo_data(&store).await?;

    let signals = Arc::new(SimulatedSignals);
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(SimulatedGateway),
        signals.clone(),
        signals,
        cfg,
    );

    // Confirmed food poisoning outbreak at a restaurant
    let summary = pipeline.run_danger_check("case-food-001").await?;
    log::info!(
        "Food poisoning case: {} matched, {} scored, {} failed, {} alerts sent",
        summary.matched,
        summary.scored,
        summary.failed,
        summary.alerts_sent
    );
    pipeline.close_case("case-food-001").await?;

    // Heat stroke cluster at a crowded gate: triggers crowd rerouting
    let summary = pipeline.run_danger_check("case-heat-001").await?;
    log::info!(
        "Heat stroke case: {} matched, {} scored, {} failed, {} alerts sent",
        summary.matched,
        summary.scored,
        summary.failed,
        summary.alerts_sent
    );
    for crowd_alert in store.list_crowd_alerts("case-heat-001").await? {
        log::info!(
            "Crowd rerouting: affected {:?}, recommended {:?}",
            crowd_alert.affected_routes,
            crowd_alert.recommended_route
        );
    }

    // Geofence reverse query around the gate
    let now = Utc::now();
    let result = geo::query_exposed_uids(
        &store.list_locations().await?,
        &GeofenceQuery {
            center_lat: 24.7050,
            center_lng: 46.6900,
            radius_meters: 500.0,
            window_start: now - Duration::hours(24),
            window_end: now,
        },
    );
    log::info!(
        "Geofence query: {} uid(s) exposed ({} scanned, {} in window, {} in fence)",
        result.exposed_uids.len(),
        result.total_locations_scanned,
        result.time_filtered_count,
        result.geofence_filtered_count
    );

    // Proactive hospital surge outlook for the event area
    let outlook = surge::assess_surge("Gate 7 Plaza", 24.7050, 46.6900, 45.5, 8.5, now);
    log::info!(
        "Surge outlook for {}: ~{} cases ({}), target {}",
        outlook.area_id,
        outlook.predicted_case_surge,
        outlook.risk,
        outlook.hospital_target
    );
    if let Some(alert) = surge::compose_hospital_alert(&outlook, now) {
        log::info!("Hospital surge alert: {}", alert.message);
    }

    Ok(())
}

/// Two incidents and their location pool, mirroring a typical day:
/// a restaurant outbreak with a couple of exposed diners and a dense
/// heat-stroke cluster at an event gate.
async fn seed_demo_data(store: &Arc<MemoryStore>) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();

    store
        .create_case(Case {
            id: "case-food-001".to_string(),
            hospital_id: "H-RYD-01".to_string(),
            case_type: CaseType::FoodPoisoning,
            confirmed: true,
            abnormal_cluster: false,
            severity: Severity::High,
            suspected_source_id: Some("REST-001".to_string()),
            suspected_source_name: Some("Al Noor Restaurant".to_string()),
            event_time: now - Duration::hours(6),
            patient_count: 4,
            status: CaseStatus::PendingCheck,
            gps_lat: None,
            gps_lng: None,
        })
        .await?;

    store
        .create_case(Case {
            id: "case-heat-001".to_string(),
            hospital_id: "H-RYD-02".to_string(),
            case_type: CaseType::HeatStroke,
            confirmed: true,
            abnormal_cluster: true,
            severity: Severity::Critical,
            suspected_source_id: Some("GATE-7".to_string()),
            suspected_source_name: Some("Gate 7 Plaza".to_string()),
            event_time: now - Duration::hours(2),
            patient_count: 9,
            status: CaseStatus::PendingCheck,
            gps_lat: Some(24.7050),
            gps_lng: Some(46.6900),
        })
        .await?;

    // Diners at the restaurant: one long stay, one brief check-in
    for (uid, offset_min) in [("anon-a1", -30i64), ("anon-a1", 20), ("anon-b2", 90)] {
        let record = LocationRecord::sanitized(
            uid,
            24.7136,
            46.6753,
            Some("REST-001".to_string()),
            Some("Al Noor Restaurant".to_string()),
            now - Duration::hours(6) + Duration::minutes(offset_min),
        )?;
        store.ingest_location(record).await?;
    }

    // Crowd at the gate: dense enough to trigger rerouting
    for i in 0..7 {
        let record = LocationRecord::sanitized(
            &format!("anon-g{}", i),
            24.7050,
            46.6900,
            Some("GATE-7".to_string()),
            Some("Gate 7 Plaza".to_string()),
            now - Duration::hours(2) + Duration::minutes(i * 10),
        )?;
        store.ingest_location(record).await?;
    }

    // Background noise at an unrelated cafe
    let record = LocationRecord::sanitized(
        "anon-z9",
        24.7300,
        46.7000,
        Some("CAFE-009".to_string()),
        None,
        now - Duration::hours(3),
    )?;
    store.ingest_location(record).await?;

    Ok(())
}
