//! Passenger-to-route matching.
//!
//! [`RouteMatcher`] decodes each candidate's polyline, measures how close the
//! pickup and dropoff come to the route, filters on the configured radius and
//! detour limits, scores what is left and ranks it.

pub mod detour;
pub mod matcher;
pub mod score;
pub mod types;

pub use detour::{estimate_detour_minutes, DetourEstimator, LinearDetourEstimator};
pub use matcher::RouteMatcher;
pub use types::{
    MatchError, MatchReport, MatchResult, RejectionReason, RouteCandidate, RouteRejection,
};
