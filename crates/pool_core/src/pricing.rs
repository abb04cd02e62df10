//! Fixed fare estimation from distance and duration.
//!
//! Formula: `total = max((distance_km * rate_per_km + duration_minutes * rate_per_minute) * surge, minimum_fare)`
//!
//! Surge is passed per call. The estimator itself never changes after
//! construction, so one instance can price concurrent requests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FareConfig;
use crate::matching::score::round_to_hundredths;
use crate::routing::OptimizedRoute;

/// Upper bound applied to demand-driven surge.
pub const MAX_SURGE_MULTIPLIER: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Demand multiplier in `[1.0, 3.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurgeMultiplier(f64);

impl SurgeMultiplier {
    pub const NONE: Self = Self(1.0);

    /// Clamp a demand factor (1.0 = normal) into the allowed surge range.
    pub fn from_demand(demand_factor: f64) -> Self {
        if !demand_factor.is_finite() {
            return Self::NONE;
        }
        Self(demand_factor.clamp(1.0, MAX_SURGE_MULTIPLIER))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for SurgeMultiplier {
    fn default() -> Self {
        Self::NONE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub rate_per_km: f64,
    pub rate_per_minute: f64,
}

/// A priced trip. Money fields are rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareQuote {
    pub total: f64,
    pub base_fare: f64,
    pub distance_cost: f64,
    pub time_cost: f64,
    pub surge_multiplier: f64,
    pub minimum_fare: f64,
    pub breakdown: FareBreakdown,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FareEstimator {
    config: FareConfig,
}

impl FareEstimator {
    pub fn new(config: FareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FareConfig {
        &self.config
    }

    pub fn calculate_fare(
        &self,
        distance_km: f64,
        duration_minutes: f64,
        surge: SurgeMultiplier,
    ) -> Result<FareQuote, PricingError> {
        check_input("distance_km", distance_km)?;
        check_input("duration_minutes", duration_minutes)?;

        let distance_cost = distance_km * self.config.rate_per_km;
        let time_cost = duration_minutes * self.config.rate_per_minute;
        let base_fare = distance_cost + time_cost;
        let total = (base_fare * surge.value()).max(self.config.minimum_fare);

        Ok(FareQuote {
            total: round_to_hundredths(total),
            base_fare: round_to_hundredths(base_fare),
            distance_cost: round_to_hundredths(distance_cost),
            time_cost: round_to_hundredths(time_cost),
            surge_multiplier: surge.value(),
            minimum_fare: self.config.minimum_fare,
            breakdown: FareBreakdown {
                distance_km,
                duration_minutes,
                rate_per_km: self.config.rate_per_km,
                rate_per_minute: self.config.rate_per_minute,
            },
        })
    }

    /// Price an optimized route using its distance and duration.
    pub fn estimate_fare_for_route(
        &self,
        route: &OptimizedRoute,
        surge: SurgeMultiplier,
    ) -> Result<FareQuote, PricingError> {
        self.calculate_fare(route.distance_km, route.duration_minutes, surge)
    }
}

fn check_input(field: &'static str, value: f64) -> Result<(), PricingError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PricingError::InvalidInput { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fare_includes_distance_and_time() {
        let estimator = FareEstimator::default();
        let quote = estimator
            .calculate_fare(10.0, 20.0, SurgeMultiplier::NONE)
            .expect("valid input");
        assert_eq!(quote.distance_cost, 15.0);
        assert_eq!(quote.time_cost, 10.0);
        assert_eq!(quote.base_fare, 25.0);
        assert_eq!(quote.total, 25.0);
        assert_eq!(quote.minimum_fare, 5.0);
    }

    #[test]
    fn short_trip_is_floored_at_minimum() {
        let quote = FareEstimator::default()
            .calculate_fare(1.0, 2.0, SurgeMultiplier::NONE)
            .expect("valid input");
        assert_eq!(quote.base_fare, 2.5);
        assert_eq!(quote.total, 5.0);
    }

    #[test]
    fn surge_scales_total_but_not_base() {
        let quote = FareEstimator::default()
            .calculate_fare(10.0, 20.0, SurgeMultiplier::from_demand(1.5))
            .expect("valid input");
        assert_eq!(quote.base_fare, 25.0);
        assert_eq!(quote.total, 37.5);
        assert_eq!(quote.surge_multiplier, 1.5);
    }

    #[test]
    fn surge_is_clamped() {
        assert_eq!(SurgeMultiplier::from_demand(0.4).value(), 1.0);
        assert_eq!(SurgeMultiplier::from_demand(7.0).value(), 3.0);
        assert_eq!(SurgeMultiplier::from_demand(f64::NAN), SurgeMultiplier::NONE);
    }

    #[test]
    fn estimator_is_not_mutated_by_surge() {
        let estimator = FareEstimator::default();
        let surged = estimator
            .calculate_fare(10.0, 20.0, SurgeMultiplier::from_demand(2.0))
            .expect("valid input");
        let normal = estimator
            .calculate_fare(10.0, 20.0, SurgeMultiplier::NONE)
            .expect("valid input");
        assert_eq!(surged.total, 50.0);
        assert_eq!(normal.total, 25.0);
    }

    #[test]
    fn negative_or_nan_input_is_rejected() {
        let estimator = FareEstimator::default();
        assert!(matches!(
            estimator.calculate_fare(-1.0, 5.0, SurgeMultiplier::NONE),
            Err(PricingError::InvalidInput { field: "distance_km", .. })
        ));
        assert!(estimator
            .calculate_fare(1.0, f64::NAN, SurgeMultiplier::NONE)
            .is_err());
    }
}
