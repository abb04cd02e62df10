//! Test helpers for common test setup and utilities.
//!
//! Fixtures sit on the equator, where 0.01 degrees of longitude is about
//! 1.113 km, so expected distances are easy to reason about.

use crate::matching::RouteCandidate;
use crate::polyline;
use crate::spatial::Coordinate;

/// Equator/prime meridian origin shared by the fixtures.
pub const ORIGIN: Coordinate = Coordinate::new(0.0, 0.0);

/// Approximate length of 0.01 degrees along the equator, in km.
pub const KM_PER_HUNDREDTH_DEGREE: f64 = 1.1132;

/// A point `hundredths` * 0.01 degrees east of [`ORIGIN`].
pub fn east_of_origin(hundredths: f64) -> Coordinate {
    Coordinate::new(0.0, hundredths * 0.01)
}

/// Build a candidate from `(lat, lng)` pairs.
pub fn route_through(id: &str, points: &[(f64, f64)]) -> RouteCandidate {
    let coords: Vec<Coordinate> = points.iter().copied().map(Coordinate::from).collect();
    RouteCandidate::new(id, polyline::encode(&coords))
}

/// A candidate whose polyline cannot be decoded.
pub fn corrupt_route(id: &str) -> RouteCandidate {
    RouteCandidate::new(id, "_p~iF~ps|U_")
}

/// A straight east-west route along the equator with `vertices` evenly spaced
/// points between longitude 0 and `end_lng`.
pub fn equator_route(id: &str, end_lng: f64, vertices: usize) -> RouteCandidate {
    let steps = vertices.max(2) - 1;
    let coords: Vec<Coordinate> = (0..=steps)
        .map(|i| Coordinate::new(0.0, end_lng * i as f64 / steps as f64))
        .collect();
    RouteCandidate::new(id, polyline::encode(&coords))
}
