#![allow(dead_code)]

use pool_core::matching::RouteCandidate;
use pool_core::test_helpers::{east_of_origin, equator_route, route_through, ORIGIN};
use pool_core::Coordinate;

/// Passenger pickup used by the scenario tests.
pub fn seeded_pickup() -> Coordinate {
    ORIGIN
}

/// Passenger dropoff about 1.1 km east of the pickup.
pub fn seeded_dropoff() -> Coordinate {
    east_of_origin(1.0)
}

/// A route whose nearest vertex is roughly 50 km north of the seeded points.
pub fn distant_route(id: &str) -> RouteCandidate {
    route_through(id, &[(0.45, 0.0), (0.46, 0.0)])
}

/// A dense route along the equator passing both seeded points.
pub fn nearby_route(id: &str) -> RouteCandidate {
    equator_route(id, 0.02, 21)
}

pub fn ids(matches: &[pool_core::MatchResult]) -> Vec<&str> {
    matches.iter().map(|m| m.route_id.as_str()).collect()
}
