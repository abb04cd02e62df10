//! Route optimization with pluggable directions providers.
//!
//! Implementations of [`RouteProvider`]:
//!
//! - **`StraightLineRouteProvider`**: geodesic start-to-end line at 40 km/h. Always available.
//! - **`OsrmRouteProvider`** / **`MapboxRouteProvider`** (feature `osrm`): HTTP directions APIs.
//! - **`CachedRouteProvider`**: LRU wrapper around any provider.
//!
//! [`RouteOptimizer`] asks the primary provider first and falls back to the
//! straight line on any failure. Stop order is taken as given.

use std::iter;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RoutingConfig;
use crate::matching::detour::AVG_URBAN_SPEED_KMH;
use crate::matching::score::round_to_hundredths;
use crate::polyline;
use crate::spatial::{distance_km, Coordinate};

pub mod response;

#[cfg(feature = "osrm")]
pub mod osrm;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointKind {
    Pickup,
    Dropoff,
}

/// An intermediate stop between the route's start and end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<WaypointKind>,
}

impl Waypoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteSource {
    #[serde(rename = "OSRM")]
    Osrm,
    Mapbox,
    Fallback,
}

/// Geometry and totals returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedPath {
    pub polyline: String,
    pub distance_km: f64,
    pub duration_minutes: f64,
}

/// Route returned to callers, with totals rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedRoute {
    pub polyline: String,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub waypoints_order: Vec<usize>,
    pub source: RouteSource,
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[cfg(feature = "osrm")]
    #[error("directions request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("directions API returned {0}")]
    Api(String),

    #[error("no route found")]
    NoRoute,

    #[error("a route needs at least two stops, got {0}")]
    TooFewStops(usize),
}

/// A directions backend. Must be `Send + Sync` so one optimizer can be shared.
pub trait RouteProvider: Send + Sync {
    /// Route through `stops` in the given order (start first, end last).
    fn route(&self, stops: &[Coordinate]) -> Result<RoutedPath, RoutingError>;

    fn source(&self) -> RouteSource;
}

// ---------------------------------------------------------------------------
// Straight-line provider (always available)
// ---------------------------------------------------------------------------

/// Direct line from the first to the last stop; intermediate stops are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineRouteProvider;

impl StraightLineRouteProvider {
    pub fn line(start: Coordinate, end: Coordinate) -> RoutedPath {
        let distance_km = distance_km(start, end);
        RoutedPath {
            polyline: polyline::encode(&[start, end]),
            distance_km,
            duration_minutes: distance_km / AVG_URBAN_SPEED_KMH * 60.0,
        }
    }
}

impl RouteProvider for StraightLineRouteProvider {
    fn route(&self, stops: &[Coordinate]) -> Result<RoutedPath, RoutingError> {
        match (stops.first(), stops.last()) {
            (Some(start), Some(end)) if stops.len() >= 2 => Ok(Self::line(*start, *end)),
            _ => Err(RoutingError::TooFewStops(stops.len())),
        }
    }

    fn source(&self) -> RouteSource {
        RouteSource::Fallback
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

/// LRU-cached wrapper around any [`RouteProvider`].
///
/// The cache key is the encoded polyline of the stop list, so stops that agree
/// to five decimals share an entry. Failures are not cached.
pub struct CachedRouteProvider {
    inner: Box<dyn RouteProvider>,
    cache: Mutex<LruCache<String, RoutedPath>>,
}

impl CachedRouteProvider {
    pub fn new(inner: Box<dyn RouteProvider>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl RouteProvider for CachedRouteProvider {
    fn route(&self, stops: &[Coordinate]) -> Result<RoutedPath, RoutingError> {
        let key = polyline::encode(stops);

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&key) {
                return Ok(hit.clone());
            }
        }

        let path = self.inner.route(stops)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, path.clone());
        }
        Ok(path)
    }

    fn source(&self) -> RouteSource {
        self.inner.source()
    }
}

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

/// Builds a route through start, waypoints and end, falling back to a straight
/// line when the primary provider is missing or fails.
pub struct RouteOptimizer {
    primary: Option<Box<dyn RouteProvider>>,
}

impl RouteOptimizer {
    pub fn new(primary: Box<dyn RouteProvider>) -> Self {
        Self {
            primary: Some(primary),
        }
    }

    /// An optimizer that only ever produces straight-line routes.
    pub fn fallback_only() -> Self {
        Self { primary: None }
    }

    pub fn optimize(
        &self,
        start: Coordinate,
        end: Coordinate,
        waypoints: &[Waypoint],
    ) -> OptimizedRoute {
        let stops: Vec<Coordinate> = iter::once(start)
            .chain(waypoints.iter().map(Waypoint::coordinate))
            .chain(iter::once(end))
            .collect();

        if let Some(primary) = &self.primary {
            match primary.route(&stops) {
                Ok(path) => {
                    debug!(source = ?primary.source(), stops = stops.len(), "route optimized");
                    return finish(path, (0..stops.len()).collect(), primary.source());
                }
                Err(err) => {
                    warn!(
                        source = ?primary.source(),
                        error = %err,
                        "routing provider failed, using straight line"
                    );
                }
            }
        }

        fallback_route(start, end, waypoints.len())
    }

    /// Route between two points with no intermediate stops.
    pub fn generate_route(&self, start: Coordinate, end: Coordinate) -> OptimizedRoute {
        self.optimize(start, end, &[])
    }
}

impl Default for RouteOptimizer {
    fn default() -> Self {
        Self::fallback_only()
    }
}

fn fallback_route(start: Coordinate, end: Coordinate, waypoint_count: usize) -> OptimizedRoute {
    // Only the endpoints are visited: index 0 and the end's index in the stop list.
    finish(
        StraightLineRouteProvider::line(start, end),
        vec![0, waypoint_count + 1],
        RouteSource::Fallback,
    )
}

fn finish(path: RoutedPath, waypoints_order: Vec<usize>, source: RouteSource) -> OptimizedRoute {
    OptimizedRoute {
        polyline: path.polyline,
        distance_km: round_to_hundredths(path.distance_km),
        duration_minutes: round_to_hundredths(path.duration_minutes),
        waypoints_order,
        source,
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Mapbox when a token is configured, otherwise OSRM. Without the `osrm`
/// feature only the straight-line fallback is available.
#[cfg(feature = "osrm")]
pub fn build_route_optimizer(config: &RoutingConfig) -> Result<RouteOptimizer, RoutingError> {
    let inner: Box<dyn RouteProvider> = match &config.mapbox_token {
        Some(token) => Box::new(osrm::MapboxRouteProvider::new(token, config.request_timeout)?),
        None => Box::new(osrm::OsrmRouteProvider::new(
            &config.osrm_endpoint,
            config.request_timeout,
        )?),
    };
    Ok(RouteOptimizer::new(Box::new(CachedRouteProvider::new(
        inner,
        config.cache_capacity,
    ))))
}

#[cfg(not(feature = "osrm"))]
pub fn build_route_optimizer(config: &RoutingConfig) -> Result<RouteOptimizer, RoutingError> {
    debug!(
        endpoint = %config.osrm_endpoint,
        "built without the `osrm` feature, routing uses straight lines only"
    );
    Ok(RouteOptimizer::fallback_only())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FailingProvider;

    impl RouteProvider for FailingProvider {
        fn route(&self, _stops: &[Coordinate]) -> Result<RoutedPath, RoutingError> {
            Err(RoutingError::Api("NoRoute".to_string()))
        }

        fn source(&self) -> RouteSource {
            RouteSource::Osrm
        }
    }

    struct CountingProvider(Arc<AtomicUsize>);

    impl RouteProvider for CountingProvider {
        fn route(&self, stops: &[Coordinate]) -> Result<RoutedPath, RoutingError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(RoutedPath {
                polyline: polyline::encode(stops),
                distance_km: 12.346,
                duration_minutes: 20.004,
            })
        }

        fn source(&self) -> RouteSource {
            RouteSource::Osrm
        }
    }

    const START: Coordinate = Coordinate::new(52.52, 13.405);
    const END: Coordinate = Coordinate::new(52.50, 13.45);

    #[test]
    fn straight_line_uses_forty_kmh() {
        let path = StraightLineRouteProvider.route(&[START, END]).expect("two stops");
        let expected = distance_km(START, END);
        assert!((path.distance_km - expected).abs() < 1e-12);
        assert!((path.duration_minutes - expected * 1.5).abs() < 1e-9);
        assert_eq!(polyline::decode(&path.polyline).expect("valid").len(), 2);
    }

    #[test]
    fn straight_line_needs_two_stops() {
        assert!(matches!(
            StraightLineRouteProvider.route(&[START]),
            Err(RoutingError::TooFewStops(1))
        ));
    }

    #[test]
    fn failing_primary_falls_back() {
        let optimizer = RouteOptimizer::new(Box::new(FailingProvider));
        let waypoint = Waypoint {
            lat: 52.51,
            lng: 13.42,
            kind: Some(WaypointKind::Pickup),
        };
        let route = optimizer.optimize(START, END, &[waypoint, waypoint]);
        assert_eq!(route.source, RouteSource::Fallback);
        assert_eq!(route.waypoints_order, vec![0, 3]);
        assert_eq!(route.distance_km, round_to_hundredths(distance_km(START, END)));
    }

    #[test]
    fn primary_success_keeps_given_order_and_rounds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let optimizer = RouteOptimizer::new(Box::new(CountingProvider(calls.clone())));
        let waypoint = Waypoint {
            lat: 52.51,
            lng: 13.42,
            kind: None,
        };
        let route = optimizer.optimize(START, END, &[waypoint]);
        assert_eq!(route.source, RouteSource::Osrm);
        assert_eq!(route.waypoints_order, vec![0, 1, 2]);
        assert_eq!(route.distance_km, 12.35);
        assert_eq!(route.duration_minutes, 20.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cache_serves_repeat_requests() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedRouteProvider::new(Box::new(CountingProvider(calls.clone())), 8);
        cached.route(&[START, END]).expect("first call");
        cached.route(&[START, END]).expect("second call");
        cached.route(&[END, START]).expect("reverse is a different key");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.cached_len(), 2);
        assert_eq!(cached.source(), RouteSource::Osrm);
    }

    #[test]
    fn cache_does_not_store_failures() {
        let cached = CachedRouteProvider::new(Box::new(FailingProvider), 8);
        assert!(cached.route(&[START, END]).is_err());
        assert_eq!(cached.cached_len(), 0);
    }

    #[test]
    fn generate_route_is_optimize_without_waypoints() {
        let route = RouteOptimizer::fallback_only().generate_route(START, END);
        assert_eq!(route.waypoints_order, vec![0, 1]);
    }

    #[test]
    fn waypoint_type_field_round_trips() {
        let wp: Waypoint =
            serde_json::from_str(r#"{"lat": 1.0, "lng": 2.0, "type": "dropoff"}"#).expect("json");
        assert_eq!(wp.kind, Some(WaypointKind::Dropoff));
        let source = serde_json::to_string(&RouteSource::Osrm).expect("serializes");
        assert_eq!(source, "\"OSRM\"");
    }
}
