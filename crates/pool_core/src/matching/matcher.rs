#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::MatcherConfig;
use crate::polyline;
use crate::spatial::{nearest_vertex_distance_km, Coordinate};

use super::detour::{DetourEstimator, LinearDetourEstimator};
use super::score::{match_score, round_to_hundredths};
use super::types::{
    MatchError, MatchReport, MatchResult, RejectionReason, RouteCandidate, RouteRejection,
};

const GOOD_MATCH: &str = "Good match";

/// Matches a passenger's pickup/dropoff against candidate routes.
///
/// Holds only read-only configuration, so one instance can serve concurrent
/// requests. Each route is evaluated independently; a route that cannot be
/// decoded is skipped without failing the request.
pub struct RouteMatcher {
    config: MatcherConfig,
    detour: Box<dyn DetourEstimator>,
}

impl RouteMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            config,
            detour: Box::new(LinearDetourEstimator),
        }
    }

    /// Replace the default distance-over-speed detour model.
    pub fn with_detour_estimator(mut self, detour: Box<dyn DetourEstimator>) -> Self {
        self.detour = detour;
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Feasible routes ranked by `match_score`, highest first. Equal scores keep
    /// their input order. Never fails; unusable routes are simply absent.
    pub fn match_routes(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
        routes: &[RouteCandidate],
    ) -> Vec<MatchResult> {
        self.evaluate_routes(pickup, dropoff, routes).matches
    }

    /// Like [`match_routes`](Self::match_routes), but fails with
    /// [`MatchError::NoRouteEvaluated`] when routes were supplied and not one of
    /// them could be evaluated.
    pub fn try_match_routes(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
        routes: &[RouteCandidate],
    ) -> Result<Vec<MatchResult>, MatchError> {
        let report = self.evaluate_routes(pickup, dropoff, routes);
        if report.nothing_evaluated() {
            return Err(MatchError::NoRouteEvaluated {
                attempted: routes.len(),
            });
        }
        Ok(report.matches)
    }

    /// Evaluate every route and keep the rejection reasons alongside the ranking.
    pub fn evaluate_routes(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
        routes: &[RouteCandidate],
    ) -> MatchReport {
        #[cfg(feature = "parallel")]
        let outcomes: Vec<_> = routes
            .par_iter()
            .map(|route| self.evaluate_route(pickup, dropoff, route))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<_> = routes
            .iter()
            .map(|route| self.evaluate_route(pickup, dropoff, route))
            .collect();

        let mut report = MatchReport::default();
        for (route, outcome) in routes.iter().zip(outcomes) {
            match outcome {
                Ok(result) => report.matches.push(result),
                Err(reason) => {
                    if reason.is_evaluation_failure() {
                        warn!(route_id = %route.id, reason = %reason, "route skipped");
                    } else {
                        debug!(route_id = %route.id, reason = %reason, "route rejected");
                    }
                    report.rejections.push(RouteRejection {
                        route_id: route.id.clone(),
                        reason,
                    });
                }
            }
        }

        // Stable: equal scores stay in input order.
        report
            .matches
            .sort_by(|a, b| b.match_score.total_cmp(&a.match_score));

        debug!(
            candidates = routes.len(),
            matched = report.matches.len(),
            rejected = report.rejections.len(),
            "route matching finished"
        );
        report
    }

    /// Evaluate one route. The first failing limit wins: pickup radius, then
    /// dropoff radius (same threshold), then detour.
    pub fn evaluate_route(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
        route: &RouteCandidate,
    ) -> Result<MatchResult, RejectionReason> {
        let path = polyline::decode(&route.polyline).map_err(RejectionReason::InvalidPolyline)?;

        let pickup_distance_km =
            nearest_vertex_distance_km(pickup, &path).ok_or(RejectionReason::EmptyPolyline)?;
        let dropoff_distance_km =
            nearest_vertex_distance_km(dropoff, &path).ok_or(RejectionReason::EmptyPolyline)?;
        if !pickup_distance_km.is_finite() || !dropoff_distance_km.is_finite() {
            return Err(RejectionReason::NonFiniteDistance);
        }

        let radius_km = self.config.max_pickup_radius_km;
        if pickup_distance_km > radius_km {
            return Err(RejectionReason::PickupTooFar {
                distance_km: pickup_distance_km,
            });
        }
        if dropoff_distance_km > radius_km {
            return Err(RejectionReason::DropoffTooFar {
                distance_km: dropoff_distance_km,
            });
        }

        let detour_minutes = self
            .detour
            .estimate_minutes(pickup_distance_km, dropoff_distance_km);
        if !detour_minutes.is_finite() {
            return Err(RejectionReason::NonFiniteDistance);
        }
        if detour_minutes > f64::from(self.config.max_detour_minutes) {
            return Err(RejectionReason::DetourTooLong {
                minutes: detour_minutes,
            });
        }

        Ok(MatchResult {
            route_id: route.id.clone(),
            match_score: match_score(
                pickup_distance_km,
                dropoff_distance_km,
                detour_minutes,
                self.config.max_detour_minutes,
            ),
            estimated_detour_minutes: detour_minutes,
            pickup_distance_km: round_to_hundredths(pickup_distance_km),
            dropoff_distance_km: round_to_hundredths(dropoff_distance_km),
            reason: GOOD_MATCH.to_string(),
        })
    }
}

impl Default for RouteMatcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}
