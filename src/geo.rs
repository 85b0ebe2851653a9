//! Great-circle distance and the geofence reverse query.
//!
//! The reverse query applies the same two-stage pattern the matcher uses:
//! filter by time window first, then by the spatial predicate. It returns
//! only unique uids, never location history.

use chrono::{DateTime, Utc};

use crate::types::LocationRecord;

/// Mean Earth radius in meters, as used by the Haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance in meters between two GPS coordinates (Haversine formula).
pub fn haversine_distance_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[derive(Debug, Clone)]
pub struct GeofenceQuery {
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_meters: f64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Query result: the exposed uids plus stage-by-stage counts for the
/// audit trail.
#[derive(Debug, Clone)]
pub struct GeofenceQueryResult {
    /// Unique uids inside the fence during the window, in first-seen order.
    pub exposed_uids: Vec<String>,
    pub total_locations_scanned: usize,
    pub time_filtered_count: usize,
    pub geofence_filtered_count: usize,
}

/// Find unique uids whose check-ins fall inside the radius during the
/// time window. Time filter runs before the distance computation so the
/// Haversine work is bounded by the window, not the full pool.
pub fn query_exposed_uids(records: &[LocationRecord], query: &GeofenceQuery) -> GeofenceQueryResult {
    let time_filtered: Vec<&LocationRecord> = records
        .iter()
        .filter(|rec| rec.timestamp >= query.window_start && rec.timestamp <= query.window_end)
        .collect();
    let time_filtered_count = time_filtered.len();

    let in_fence: Vec<&LocationRecord> = time_filtered
        .into_iter()
        .filter(|rec| {
            haversine_distance_m(query.center_lat, query.center_lng, rec.lat, rec.lng)
                <= query.radius_meters
        })
        .collect();
    let geofence_filtered_count = in_fence.len();

    let mut seen = std::collections::HashSet::new();
    let exposed_uids: Vec<String> = in_fence
        .into_iter()
        .filter(|rec| seen.insert(rec.uid.clone()))
        .map(|rec| rec.uid.clone())
        .collect();

    GeofenceQueryResult {
        exposed_uids,
        total_locations_scanned: records.len(),
        time_filtered_count,
        geofence_filtered_count,
    }
}
