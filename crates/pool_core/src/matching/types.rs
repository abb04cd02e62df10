use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::polyline::PolylineError;
use crate::spatial::Coordinate;

/// A driver route offered to the passenger. Only `id` and `polyline` take part
/// in matching; the remaining fields are carried for the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub id: String,
    pub polyline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_point: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_point: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depart_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats_left: Option<i32>,
}

impl RouteCandidate {
    pub fn new(id: impl Into<String>, polyline: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            polyline: polyline.into(),
            start_point: None,
            end_point: None,
            depart_time: None,
            seats_left: None,
        }
    }
}

/// A feasible route with its score. Distances are rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub route_id: String,
    pub match_score: f64,
    pub estimated_detour_minutes: f64,
    pub pickup_distance_km: f64,
    pub dropoff_distance_km: f64,
    pub reason: String,
}

/// Why a route was left out of the ranking.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    InvalidPolyline(PolylineError),
    EmptyPolyline,
    NonFiniteDistance,
    PickupTooFar { distance_km: f64 },
    DropoffTooFar { distance_km: f64 },
    DetourTooLong { minutes: f64 },
}

impl RejectionReason {
    /// True when the route could not be evaluated at all, as opposed to being
    /// evaluated and failing a feasibility limit.
    pub fn is_evaluation_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidPolyline(_) | Self::EmptyPolyline | Self::NonFiniteDistance
        )
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPolyline(err) => write!(f, "Invalid polyline: {}", err),
            Self::EmptyPolyline => f.write_str("Route polyline has no points"),
            Self::NonFiniteDistance => f.write_str("Distance to route is not a finite number"),
            Self::PickupTooFar { distance_km } => {
                write!(f, "Pickup too far from route ({:.2} km)", distance_km)
            }
            Self::DropoffTooFar { distance_km } => {
                write!(f, "Dropoff too far from route ({:.2} km)", distance_km)
            }
            Self::DetourTooLong { minutes } => {
                write!(f, "Detour too long ({} minutes)", minutes)
            }
        }
    }
}

/// An excluded route and the first limit it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRejection {
    pub route_id: String,
    pub reason: RejectionReason,
}

/// Full outcome of one match request. `matches` is ranked, `rejections` keeps
/// input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub matches: Vec<MatchResult>,
    pub rejections: Vec<RouteRejection>,
}

impl MatchReport {
    pub fn candidate_count(&self) -> usize {
        self.matches.len() + self.rejections.len()
    }

    pub fn evaluation_failures(&self) -> impl Iterator<Item = &RouteRejection> {
        self.rejections
            .iter()
            .filter(|rejection| rejection.reason.is_evaluation_failure())
    }

    /// True when there was at least one candidate and none could be evaluated.
    pub fn nothing_evaluated(&self) -> bool {
        let candidates = self.candidate_count();
        candidates > 0 && self.evaluation_failures().count() == candidates
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("none of the {attempted} candidate routes could be evaluated")]
    NoRouteEvaluated { attempted: usize },
}
