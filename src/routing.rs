//! Crowd rerouting over a fixed set of named routes.
//!
//! A route is unsafe when any of its waypoints falls inside the active
//! hazard bounding box. Among safe routes, the cheapest wins: total
//! great-circle path length plus a per-route congestion penalty.

use crate::geo::haversine_distance_m;

/// Axis-aligned bounding box marking the active hazard area.
#[derive(Debug, Clone, Copy)]
pub struct HazardZone {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl HazardZone {
    /// Box of `half_span_deg` degrees around a center point.
    pub fn around(lat: f64, lng: f64, half_span_deg: f64) -> Self {
        HazardZone {
            lat_min: lat - half_span_deg,
            lat_max: lat + half_span_deg,
            lng_min: lng - half_span_deg,
            lng_max: lng + half_span_deg,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lng >= self.lng_min && lng <= self.lng_max
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub name: &'static str,
    pub waypoints: &'static [(f64, f64)],
    /// Fixed congestion penalty in meters added to the route cost.
    pub penalty_m: f64,
}

/// The managed diversion routes around the event area. Route C carries
/// a standing congestion penalty.
pub const ROUTES: [Route; 3] = [
    Route {
        name: "Route A",
        waypoints: &[(24.71, 46.67), (24.71, 46.68), (24.70, 46.69)],
        penalty_m: 0.0,
    },
    Route {
        name: "Route B",
        waypoints: &[(24.72, 46.66), (24.70, 46.67), (24.69, 46.68)],
        penalty_m: 0.0,
    },
    Route {
        name: "Route C",
        waypoints: &[(24.73, 46.69), (24.71, 46.69), (24.70, 46.70)],
        penalty_m: 5_000.0,
    },
];

/// Advisory output: which routes to close, which one to divert onto.
#[derive(Debug, Clone)]
pub struct RouteDiversion {
    pub affected_routes: Vec<String>,
    /// None when every route crosses the hazard; crowds should hold
    /// position instead of moving.
    pub recommended_route: Option<String>,
}

pub fn route_is_hazardous(route: &Route, hazard: &HazardZone) -> bool {
    route
        .waypoints
        .iter()
        .any(|&(lat, lng)| hazard.contains(lat, lng))
}

fn polyline_length_m(waypoints: &[(f64, f64)]) -> f64 {
    waypoints
        .windows(2)
        .map(|pair| haversine_distance_m(pair[0].0, pair[0].1, pair[1].0, pair[1].1))
        .sum()
}

fn route_cost_m(route: &Route, origin: Option<(f64, f64)>, destination: Option<(f64, f64)>) -> f64 {
    let mut cost = polyline_length_m(route.waypoints);
    if let (Some(origin), Some(&first)) = (origin, route.waypoints.first()) {
        cost += haversine_distance_m(origin.0, origin.1, first.0, first.1);
    }
    if let (Some(dest), Some(&last)) = (destination, route.waypoints.last()) {
        cost += haversine_distance_m(last.0, last.1, dest.0, dest.1);
    }
    cost + route.penalty_m
}

/// Point-to-point variant: the safest route from origin to destination,
/// skipping hazardous routes and minimizing approach + path + egress
/// distance plus penalty. None when no safe route exists.
pub fn find_safest_route(
    origin: (f64, f64),
    destination: (f64, f64),
    hazard: &HazardZone,
) -> Option<&'static str> {
    ROUTES
        .iter()
        .filter(|route| !route_is_hazardous(route, hazard))
        .map(|route| (route.name, route_cost_m(route, Some(origin), Some(destination))))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name)
}

/// Area-wide diversion advisory: routes crossing the hazard are
/// affected, and the cheapest remaining route is recommended. With no
/// active hazard, nothing is affected and the overall cheapest route is
/// recommended.
pub fn divert_around(hazard: Option<&HazardZone>) -> RouteDiversion {
    let affected_routes: Vec<String> = match hazard {
        Some(zone) => ROUTES
            .iter()
            .filter(|route| route_is_hazardous(route, zone))
            .map(|route| route.name.to_string())
            .collect(),
        None => Vec::new(),
    };

    let recommended_route = ROUTES
        .iter()
        .filter(|route| match hazard {
            Some(zone) => !route_is_hazardous(route, zone),
            None => true,
        })
        .map(|route| (route.name, route_cost_m(route, None, None)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name.to_string());

    RouteDiversion {
        affected_routes,
        recommended_route,
    }
}
