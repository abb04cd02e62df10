//! Directions API response shapes shared by OSRM and Mapbox.
//!
//! Both services answer `route/v1`-style requests with a `routes` array whose
//! first entry carries distance (metres), duration (seconds) and, with
//! `geometries=polyline`, an encoded polyline.

use serde::Deserialize;

use super::{RoutedPath, RoutingError};

#[derive(Debug, Deserialize)]
pub struct DirectionsResponse {
    pub code: Option<String>,
    pub message: Option<String>,
    pub routes: Option<Vec<DirectionsRoute>>,
}

#[derive(Debug, Deserialize)]
pub struct DirectionsRoute {
    pub distance: f64,
    pub duration: f64,
    pub geometry: String,
}

/// Turn a response into a path. OSRM signals success with `code == "Ok"`;
/// Mapbox is accepted as soon as it returns a route.
pub fn parse_directions(
    resp: DirectionsResponse,
    require_ok_code: bool,
) -> Result<RoutedPath, RoutingError> {
    if require_ok_code && resp.code.as_deref() != Some("Ok") {
        let code = resp.code.unwrap_or_else(|| "no code".to_string());
        let detail = match resp.message {
            Some(message) => format!("{}: {}", code, message),
            None => code,
        };
        return Err(RoutingError::Api(detail));
    }

    let route = resp
        .routes
        .and_then(|routes| routes.into_iter().next())
        .ok_or(RoutingError::NoRoute)?;

    Ok(RoutedPath {
        polyline: route.geometry,
        distance_km: route.distance / 1000.0,
        duration_minutes: route.duration / 60.0,
    })
}
