//! Spatial operations: coordinates and great-circle distances.
//!
//! Distances are ellipsoidal (WGS-84 geodesic, Karney's algorithm) so they agree
//! with the upstream routing stack to well under a metre. A spherical Haversine
//! variant is kept for quick comparisons.

use geo::{Distance, Geodesic, Point};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the spherical approximation.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and inside the geographic range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    fn to_point(self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

/// Geodesic distance between two coordinates in kilometres.
///
/// Non-finite input yields `NaN` instead of reaching the solver; callers decide
/// how to treat a degenerate distance.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return f64::NAN;
    }
    if a == b {
        return 0.0;
    }
    Geodesic.distance(a.to_point(), b.to_point()) / 1000.0
}

/// Spherical (Haversine) distance in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let sin_dlat = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon = ((lon2 - lon1) * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Smallest distance from `point` to any vertex of `vertices`.
///
/// Only vertices are considered, never the segments between them, so a point
/// beside a long straight segment reports the distance to the nearer endpoint.
/// Returns `None` for an empty path.
pub fn nearest_vertex_distance_km(point: Coordinate, vertices: &[Coordinate]) -> Option<f64> {
    vertices
        .iter()
        .map(|vertex| distance_km(point, *vertex))
        .reduce(|best, d| if d < best || best.is_nan() { d } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BERLIN: Coordinate = Coordinate::new(52.5200, 13.4050);
    const PARIS: Coordinate = Coordinate::new(48.8566, 2.3522);

    #[test]
    fn berlin_to_paris_is_about_878_km() {
        let d = distance_km(BERLIN, PARIS);
        assert!((d - 878.0).abs() < 5.0, "Berlin-Paris: {}", d);
    }

    #[test]
    fn geodesic_and_haversine_agree_within_half_a_percent() {
        let geodesic = distance_km(BERLIN, PARIS);
        let spherical = haversine_km(BERLIN, PARIS);
        assert!(((geodesic - spherical) / geodesic).abs() < 0.005);
    }

    #[test]
    fn hundredth_degree_on_equator_is_about_1113_m() {
        let d = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01));
        assert!((d - 1.1132).abs() < 0.001, "got {}", d);
    }

    #[test]
    fn same_point_is_zero_and_distance_is_symmetric() {
        assert_eq!(distance_km(BERLIN, BERLIN), 0.0);
        let d1 = distance_km(BERLIN, PARIS);
        let d2 = distance_km(PARIS, BERLIN);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn non_finite_input_is_nan() {
        let bad = Coordinate::new(f64::NAN, 0.0);
        assert!(distance_km(bad, BERLIN).is_nan());
        assert!(!bad.is_valid());
    }

    #[test]
    fn validity_checks_range() {
        assert!(Coordinate::new(90.0, -180.0).is_valid());
        assert!(!Coordinate::new(90.5, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 180.1).is_valid());
    }

    #[test]
    fn nearest_vertex_picks_minimum() {
        let path = [PARIS, BERLIN, Coordinate::new(0.0, 0.0)];
        let d = nearest_vertex_distance_km(BERLIN, &path).expect("non-empty path");
        assert_eq!(d, 0.0);
        assert_eq!(nearest_vertex_distance_km(BERLIN, &[]), None);
    }

    #[test]
    fn nearest_vertex_ignores_segment_interior() {
        // Pickup sits on the segment midpoint, but only the endpoints count.
        let path = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.02)];
        let d = nearest_vertex_distance_km(Coordinate::new(0.0, 0.01), &path).expect("path");
        assert!(d > 1.1);
    }
}
