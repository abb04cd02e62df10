//! HTTP directions providers: OSRM and Mapbox.
//!
//! Both use a blocking `reqwest` client with a request timeout and ask for the
//! full overview geometry as an encoded polyline.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;

use super::response::{parse_directions, DirectionsResponse};
use super::{RouteProvider, RouteSource, RoutedPath, RoutingError};
use crate::spatial::Coordinate;

const MAPBOX_DIRECTIONS_URL: &str = "https://api.mapbox.com/directions/v5/mapbox/driving";

/// Routes via an OSRM HTTP endpoint.
#[derive(Debug, Clone)]
pub struct OsrmRouteProvider {
    client: Client,
    endpoint: String,
}

impl OsrmRouteProvider {
    /// Create a provider for the given endpoint (e.g. `http://localhost:5000`).
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RoutingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, stops: &[Coordinate]) -> Result<Url, RoutingError> {
        let base = format!("{}/route/v1/driving/{}", self.endpoint, coordinate_path(stops));
        let mut url = Url::parse(&base)
            .map_err(|err| RoutingError::Api(format!("failed to build OSRM URL: {}", err)))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "polyline");
        Ok(url)
    }
}

impl RouteProvider for OsrmRouteProvider {
    fn route(&self, stops: &[Coordinate]) -> Result<RoutedPath, RoutingError> {
        if stops.len() < 2 {
            return Err(RoutingError::TooFewStops(stops.len()));
        }
        let url = self.url(stops)?;
        let response = self.client.get(url).send()?.error_for_status()?;
        let parsed: DirectionsResponse = response.json()?;
        parse_directions(parsed, true)
    }

    fn source(&self) -> RouteSource {
        RouteSource::Osrm
    }
}

/// Routes via the Mapbox Directions API.
#[derive(Debug, Clone)]
pub struct MapboxRouteProvider {
    client: Client,
    access_token: String,
}

impl MapboxRouteProvider {
    pub fn new(access_token: &str, timeout: Duration) -> Result<Self, RoutingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            access_token: access_token.to_string(),
        })
    }

    fn url(&self, stops: &[Coordinate]) -> Result<Url, RoutingError> {
        let base = format!("{}/{}", MAPBOX_DIRECTIONS_URL, coordinate_path(stops));
        let mut url = Url::parse(&base)
            .map_err(|err| RoutingError::Api(format!("failed to build Mapbox URL: {}", err)))?;
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token)
            .append_pair("geometries", "polyline")
            .append_pair("overview", "full");
        Ok(url)
    }
}

impl RouteProvider for MapboxRouteProvider {
    fn route(&self, stops: &[Coordinate]) -> Result<RoutedPath, RoutingError> {
        if stops.len() < 2 {
            return Err(RoutingError::TooFewStops(stops.len()));
        }
        let url = self.url(stops)?;
        let response = self.client.get(url).send()?.error_for_status()?;
        let parsed: DirectionsResponse = response.json()?;
        parse_directions(parsed, false)
    }

    fn source(&self) -> RouteSource {
        RouteSource::Mapbox
    }
}

/// `lng,lat;lng,lat;...` as both APIs expect.
fn coordinate_path(stops: &[Coordinate]) -> String {
    stops
        .iter()
        .map(|stop| format!("{},{}", stop.lng, stop.lat))
        .collect::<Vec<_>>()
        .join(";")
}
