//! Ride-pooling core: passenger-to-route matching, detour estimation,
//! fare estimation and route optimization with a straight-line fallback.
//!
//! The matching path is synchronous and CPU-only. Network access is confined
//! to the optional HTTP route providers behind the `osrm` feature.

pub mod config;
pub mod matching;
pub mod polyline;
pub mod pricing;
pub mod routing;
pub mod service;
pub mod spatial;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use config::{ConfigError, FareConfig, MatcherConfig, RoutingConfig};
pub use matching::{MatchError, MatchReport, MatchResult, RouteCandidate, RouteMatcher};
pub use spatial::{distance_km, Coordinate};
