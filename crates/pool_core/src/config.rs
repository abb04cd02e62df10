//! Process-wide configuration read once at startup.
//!
//! Values come from environment-style variables. A missing or blank variable
//! takes its default; a present but unparseable or out-of-range value is an
//! error so the process refuses to start instead of running on a guess.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_DETOUR_MINUTES: &str = "MAX_DETOUR_MINUTES";
pub const MIN_EXTRA_TIME_MINUTES: &str = "MIN_EXTRA_TIME_MINUTES";
pub const MAX_PICKUP_RADIUS_KM: &str = "MAX_PICKUP_RADIUS_KM";
pub const BASE_FARE_PER_KM: &str = "BASE_FARE_PER_KM";
pub const BASE_FARE_PER_MINUTE: &str = "BASE_FARE_PER_MINUTE";
pub const MINIMUM_FARE: &str = "MINIMUM_FARE";
pub const OSRM_API_URL: &str = "OSRM_API_URL";
pub const MAPBOX_ACCESS_TOKEN: &str = "MAPBOX_ACCESS_TOKEN";

const DEFAULT_OSRM_API_URL: &str = "http://router.project-osrm.org";
const DEFAULT_ROUTING_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name}={value:?} is not valid: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{name}={value} is out of range: {expected}")]
    OutOfRange {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Route matcher thresholds. Read-only once built; share freely across threads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Routes whose estimated detour exceeds this are excluded. Also the
    /// denominator of the detour score, so it must be at least 1.
    pub max_detour_minutes: u32,
    /// Reserved. No filter reads it yet.
    pub min_extra_time_minutes: u32,
    /// Maximum distance from both pickup and dropoff to the nearest route vertex.
    pub max_pickup_radius_km: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_detour_minutes: 15,
            min_extra_time_minutes: 5,
            max_pickup_radius_km: 2.0,
        }
    }
}

impl MatcherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_detour_minutes: read_var(&lookup, MAX_DETOUR_MINUTES, defaults.max_detour_minutes)?,
            min_extra_time_minutes: read_var(
                &lookup,
                MIN_EXTRA_TIME_MINUTES,
                defaults.min_extra_time_minutes,
            )?,
            max_pickup_radius_km: read_var(
                &lookup,
                MAX_PICKUP_RADIUS_KM,
                defaults.max_pickup_radius_km,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_detour_minutes == 0 {
            return Err(out_of_range(MAX_DETOUR_MINUTES, self.max_detour_minutes, ">= 1"));
        }
        if !self.max_pickup_radius_km.is_finite() || self.max_pickup_radius_km <= 0.0 {
            return Err(out_of_range(
                MAX_PICKUP_RADIUS_KM,
                self.max_pickup_radius_km,
                "finite and > 0",
            ));
        }
        Ok(())
    }
}

/// Linear fare rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareConfig {
    pub rate_per_km: f64,
    pub rate_per_minute: f64,
    pub minimum_fare: f64,
}

impl Default for FareConfig {
    fn default() -> Self {
        Self {
            rate_per_km: 1.5,
            rate_per_minute: 0.5,
            minimum_fare: 5.0,
        }
    }
}

impl FareConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            rate_per_km: read_var(&lookup, BASE_FARE_PER_KM, defaults.rate_per_km)?,
            rate_per_minute: read_var(&lookup, BASE_FARE_PER_MINUTE, defaults.rate_per_minute)?,
            minimum_fare: read_var(&lookup, MINIMUM_FARE, defaults.minimum_fare)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            (BASE_FARE_PER_KM, self.rate_per_km),
            (BASE_FARE_PER_MINUTE, self.rate_per_minute),
            (MINIMUM_FARE, self.minimum_fare),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(out_of_range(name, value, "finite and >= 0"));
            }
        }
        Ok(())
    }
}

/// Where the route optimizer sends directions requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    pub osrm_endpoint: String,
    /// When set, Mapbox is used instead of OSRM.
    pub mapbox_token: Option<String>,
    pub request_timeout: Duration,
    pub cache_capacity: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            osrm_endpoint: DEFAULT_OSRM_API_URL.to_string(),
            mapbox_token: None,
            request_timeout: DEFAULT_ROUTING_TIMEOUT,
            cache_capacity: DEFAULT_ROUTE_CACHE_CAPACITY,
        }
    }
}

impl RoutingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            osrm_endpoint: non_blank(OSRM_API_URL).unwrap_or(defaults.osrm_endpoint),
            mapbox_token: non_blank(MAPBOX_ACCESS_TOKEN),
            ..defaults
        }
    }

    pub fn use_mapbox(&self) -> bool {
        self.mapbox_token.is_some()
    }
}

fn read_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
                name,
                value: raw.clone(),
                reason: err.to_string(),
            })
        }
        _ => Ok(default),
    }
}

fn out_of_range(name: &'static str, value: impl Display, expected: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        name,
        value: value.to_string(),
        expected,
    }
}
