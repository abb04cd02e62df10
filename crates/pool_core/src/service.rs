//! Request/response contract for the route pool service.
//!
//! Transport-agnostic: an HTTP server, a Lambda handler or the CLI parses the
//! request body, calls a handler, and maps [`ServiceError::status_code`] onto its
//! own status scheme. Successful responses use a `{"success": true, ...}`
//! envelope and errors serialize as `{"error": "..."}`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::{ConfigError, FareConfig, MatcherConfig, RoutingConfig};
use crate::matching::{MatchError, MatchResult, RouteCandidate, RouteMatcher};
use crate::pricing::{FareEstimator, FareQuote, PricingError, SurgeMultiplier};
use crate::routing::{build_route_optimizer, OptimizedRoute, RouteOptimizer, RoutingError, Waypoint};
use crate::spatial::Coordinate;

pub const SERVICE_NAME: &str = "RoutePool AI Service";

const MISSING_PASSENGER_POINTS: &str = "Missing passenger pickup or dropoff location";
const MISSING_ROUTE_ENDPOINTS: &str = "Missing start or end point";
const MISSING_DISTANCE_OR_DURATION: &str = "Missing distance or duration";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRouteRequest {
    pub passenger_pickup: Option<Coordinate>,
    pub passenger_dropoff: Option<Coordinate>,
    #[serde(default)]
    pub routes: Vec<RouteCandidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRouteRequest {
    pub start_point: Option<Coordinate>,
    pub end_point: Option<Coordinate>,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimateFareRequest {
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_point: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff_point: Option<Coordinate>,
    /// 1.0 = normal demand. Clamped to the surge range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand_factor: Option<f64>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRouteResponse {
    pub success: bool,
    pub matched_routes: Vec<MatchResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRouteResponse {
    pub success: bool,
    pub optimized_route: OptimizedRoute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateFareResponse {
    pub success: bool,
    pub fare: FareQuote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    MissingField(&'static str),

    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    NoRouteEvaluated(#[from] MatchError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP-style status for the transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingField(_) | Self::InvalidInput(_) => 400,
            Self::NoRouteEvaluated(_) => 422,
            Self::Internal(_) => 500,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

impl From<PricingError> for ServiceError {
    fn from(err: PricingError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Startup failures. Fatal: the service must not start on bad configuration.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// All configuration the service needs, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceConfig {
    pub matcher: MatcherConfig,
    pub fares: FareConfig,
    pub routing: RoutingConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            matcher: MatcherConfig::from_env()?,
            fares: FareConfig::from_env()?,
            routing: RoutingConfig::from_env(),
        })
    }
}

pub struct RoutePoolService {
    matcher: RouteMatcher,
    optimizer: RouteOptimizer,
    fares: FareEstimator,
}

impl RoutePoolService {
    pub fn new(matcher: RouteMatcher, optimizer: RouteOptimizer, fares: FareEstimator) -> Self {
        Self {
            matcher,
            optimizer,
            fares,
        }
    }

    /// Validate configuration and wire up the routing backend.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, StartupError> {
        config.matcher.validate()?;
        config.fares.validate()?;
        let optimizer = build_route_optimizer(&config.routing)?;
        info!(
            max_detour_minutes = config.matcher.max_detour_minutes,
            max_pickup_radius_km = config.matcher.max_pickup_radius_km,
            mapbox = config.routing.use_mapbox(),
            "route pool service configured"
        );
        Ok(Self::new(
            RouteMatcher::new(config.matcher),
            optimizer,
            FareEstimator::new(config.fares),
        ))
    }

    pub fn matcher(&self) -> &RouteMatcher {
        &self.matcher
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "OK".to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    #[instrument(skip_all, fields(routes = request.routes.len()))]
    pub fn match_route(&self, request: &MatchRouteRequest) -> Result<MatchRouteResponse, ServiceError> {
        let (pickup, dropoff) = match (request.passenger_pickup, request.passenger_dropoff) {
            (Some(pickup), Some(dropoff)) => (pickup, dropoff),
            _ => return Err(ServiceError::MissingField(MISSING_PASSENGER_POINTS)),
        };
        let matched_routes = self.matcher.try_match_routes(pickup, dropoff, &request.routes)?;
        Ok(MatchRouteResponse {
            success: true,
            matched_routes,
        })
    }

    #[instrument(skip_all, fields(waypoints = request.waypoints.len()))]
    pub fn optimize_route(
        &self,
        request: &OptimizeRouteRequest,
    ) -> Result<OptimizeRouteResponse, ServiceError> {
        let (start, end) = match (request.start_point, request.end_point) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(ServiceError::MissingField(MISSING_ROUTE_ENDPOINTS)),
        };
        Ok(OptimizeRouteResponse {
            success: true,
            optimized_route: self.optimizer.optimize(start, end, &request.waypoints),
        })
    }

    #[instrument(skip_all)]
    pub fn estimate_fare(
        &self,
        request: &EstimateFareRequest,
    ) -> Result<EstimateFareResponse, ServiceError> {
        let (distance_km, duration_minutes) = match (request.distance_km, request.duration_minutes) {
            (Some(distance), Some(duration)) => (distance, duration),
            _ => return Err(ServiceError::MissingField(MISSING_DISTANCE_OR_DURATION)),
        };
        let surge = request
            .demand_factor
            .map(SurgeMultiplier::from_demand)
            .unwrap_or_default();
        let fare = self.fares.calculate_fare(distance_km, duration_minutes, surge)?;
        Ok(EstimateFareResponse {
            success: true,
            fare,
        })
    }
}

impl Default for RoutePoolService {
    fn default() -> Self {
        Self::new(
            RouteMatcher::default(),
            RouteOptimizer::fallback_only(),
            FareEstimator::default(),
        )
    }
}

/// Parse a JSON body into a request, mapping syntax errors to a 400.
pub fn parse_request<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, ServiceError> {
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyline::encode;

    #[test]
    fn missing_dropoff_is_a_client_error() {
        let service = RoutePoolService::default();
        let request = MatchRouteRequest {
            passenger_pickup: Some(Coordinate::new(0.0, 0.0)),
            ..Default::default()
        };
        let err = service.match_route(&request).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_body().error, MISSING_PASSENGER_POINTS);
    }

    #[test]
    fn routes_default_to_empty() {
        let request: MatchRouteRequest = parse_request(
            r#"{"passenger_pickup":{"lat":0,"lng":0},"passenger_dropoff":{"lat":0,"lng":0.01}}"#,
        )
        .expect("valid body");
        let response = RoutePoolService::default()
            .match_route(&request)
            .expect("empty routes is not an error");
        assert!(response.success);
        assert!(response.matched_routes.is_empty());
    }

    #[test]
    fn all_corrupt_routes_map_to_422() {
        let request = MatchRouteRequest {
            passenger_pickup: Some(Coordinate::new(0.0, 0.0)),
            passenger_dropoff: Some(Coordinate::new(0.0, 0.0)),
            routes: vec![RouteCandidate::new("bad", "_")],
        };
        let err = RoutePoolService::default().match_route(&request).unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn match_envelope_serializes_expected_fields() {
        let origin = Coordinate::new(0.0, 0.0);
        let request = MatchRouteRequest {
            passenger_pickup: Some(origin),
            passenger_dropoff: Some(origin),
            routes: vec![RouteCandidate::new("r1", encode(&[origin]))],
        };
        let response = RoutePoolService::default().match_route(&request).expect("matches");
        let json = serde_json::to_value(&response).expect("serializes");
        assert_eq!(json["success"], true);
        let first = &json["matched_routes"][0];
        assert_eq!(first["route_id"], "r1");
        assert_eq!(first["reason"], "Good match");
        assert!(first.get("match_score").is_some());
        assert!(first.get("estimated_detour_minutes").is_some());
    }

    #[test]
    fn fare_request_uses_defaults() {
        let response = RoutePoolService::default()
            .estimate_fare(&EstimateFareRequest {
                distance_km: Some(10.0),
                duration_minutes: Some(20.0),
                ..Default::default()
            })
            .expect("priced");
        assert_eq!(response.fare.total, 25.0);
        assert_eq!(response.fare.surge_multiplier, 1.0);
    }

    #[test]
    fn fare_request_without_duration_is_rejected() {
        let err = RoutePoolService::default()
            .estimate_fare(&EstimateFareRequest {
                distance_km: Some(10.0),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.to_string(), MISSING_DISTANCE_OR_DURATION);
    }

    #[test]
    fn negative_fare_distance_is_a_client_error() {
        let err = RoutePoolService::default()
            .estimate_fare(&EstimateFareRequest {
                distance_km: Some(-3.0),
                duration_minutes: Some(1.0),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn optimize_without_provider_falls_back() {
        let response = RoutePoolService::default()
            .optimize_route(&OptimizeRouteRequest {
                start_point: Some(Coordinate::new(52.52, 13.405)),
                end_point: Some(Coordinate::new(52.5, 13.45)),
                waypoints: Vec::new(),
            })
            .expect("fallback always succeeds");
        let json = serde_json::to_value(&response).expect("serializes");
        assert_eq!(json["optimized_route"]["source"], "Fallback");
    }

    #[test]
    fn malformed_json_is_a_client_error() {
        let err = parse_request::<MatchRouteRequest>("{not json").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn bad_config_refuses_to_start() {
        let config = ServiceConfig {
            matcher: MatcherConfig {
                max_detour_minutes: 0,
                ..MatcherConfig::default()
            },
            ..ServiceConfig::default()
        };
        assert!(matches!(
            RoutePoolService::from_config(&config),
            Err(StartupError::Config(_))
        ));
    }

    #[test]
    fn health_reports_service_name() {
        let health = RoutePoolService::default().health();
        assert_eq!(health.status, "OK");
        assert_eq!(health.service, SERVICE_NAME);
    }
}
