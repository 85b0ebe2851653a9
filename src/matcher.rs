//! Co-location matcher: which uids were at a case's suspected source
//! within the exposure window.
//!
//! Two-stage filter, same shape as the geofence reverse query: time
//! window first, then the spatial predicate (here location_id equality
//! instead of a radius). Dedupe keeps one touchpoint per uid.

use chrono::{DateTime, Utc};

use crate::types::{Case, LocationRecord, MatchedExposure};

/// All pool records at the case's suspected source within the window.
/// Empty when the case has no suspected source; that is "no matches",
/// not an error.
pub fn qualifying_records<'a>(
    case: &Case,
    pool: &'a [LocationRecord],
    window_hours: i64,
) -> Vec<&'a LocationRecord> {
    let source_id = match case.suspected_source_id.as_deref() {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Vec::new(),
    };

    let window_secs = window_hours * 3600;
    pool.iter()
        .filter(|rec| rec.location_id == source_id)
        .filter(|rec| {
            (rec.timestamp - case.event_time).num_seconds().abs() <= window_secs
        })
        .collect()
}

/// Match a case against the location pool, producing one exposure per
/// uid. Tie-break rule: the retained touchpoint is the qualifying record
/// closest in time to the case's event time, with earlier timestamps
/// winning exact ties, so the result does not depend on pool order.
pub fn match_exposures(
    case: &Case,
    pool: &[LocationRecord],
    window_hours: i64,
) -> Vec<MatchedExposure> {
    let qualifying = qualifying_records(case, pool, window_hours);

    let mut best: std::collections::HashMap<&str, &LocationRecord> = std::collections::HashMap::new();
    for rec in qualifying {
        let entry = best.entry(rec.uid.as_str()).or_insert(rec);
        if closer_to(rec, entry, case.event_time) {
            *entry = rec;
        }
    }

    let mut exposures: Vec<MatchedExposure> = best
        .into_values()
        .map(|rec| MatchedExposure {
            case_id: case.id.clone(),
            uid: rec.uid.clone(),
            matched_location_id: rec.location_id.clone(),
            matched_location_name: rec.location_name.clone(),
            matched_timestamp: rec.timestamp,
            notification_sent: false,
        })
        .collect();

    // Stable output order for logs and record creation
    exposures.sort_by(|a, b| a.uid.cmp(&b.uid));
    exposures
}

/// Whether `candidate` beats `current` as the matched touchpoint.
fn closer_to(candidate: &LocationRecord, current: &LocationRecord, event_time: DateTime<Utc>) -> bool {
    let cand_delta = (candidate.timestamp - event_time).num_seconds().abs();
    let curr_delta = (current.timestamp - event_time).num_seconds().abs();
    cand_delta < curr_delta
        || (cand_delta == curr_delta && candidate.timestamp < current.timestamp)
}
