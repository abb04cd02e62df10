/// Assumed average urban speed for detour estimation (km/h).
pub const AVG_URBAN_SPEED_KMH: f64 = 40.0;

/// Fixed time added to every detour for the pickup and dropoff stops.
pub const STOP_OVERHEAD_MINUTES: f64 = 5.0;

/// Converts pickup/dropoff proximity into added travel time.
///
/// The default [`LinearDetourEstimator`] is a distance-over-speed model. A
/// road-network implementation can be swapped in through
/// [`RouteMatcher::with_detour_estimator`](super::RouteMatcher::with_detour_estimator).
pub trait DetourEstimator: Send + Sync {
    /// Estimated added minutes for serving the passenger.
    fn estimate_minutes(&self, pickup_distance_km: f64, dropoff_distance_km: f64) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearDetourEstimator;

impl DetourEstimator for LinearDetourEstimator {
    fn estimate_minutes(&self, pickup_distance_km: f64, dropoff_distance_km: f64) -> f64 {
        estimate_detour_minutes(pickup_distance_km, dropoff_distance_km)
    }
}

/// `round((pickup + dropoff) / 40 * 60 + 5)`, rounding halves to even.
pub fn estimate_detour_minutes(pickup_distance_km: f64, dropoff_distance_km: f64) -> f64 {
    let total_km = pickup_distance_km + dropoff_distance_km;
    let minutes = total_km / AVG_URBAN_SPEED_KMH * 60.0 + STOP_OVERHEAD_MINUTES;
    minutes.round_ties_even()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_costs_only_stop_overhead() {
        assert_eq!(estimate_detour_minutes(0.0, 0.0), 5.0);
    }

    #[test]
    fn forty_km_is_one_hour_plus_overhead() {
        assert_eq!(estimate_detour_minutes(25.0, 15.0), 65.0);
    }

    #[test]
    fn rounds_to_nearest_minute() {
        // 1.0 km -> 1.5 min + 5 = 6.5 -> 6 (half to even)
        assert_eq!(estimate_detour_minutes(0.5, 0.5), 6.0);
        // 1.2 km -> 1.8 min + 5 = 6.8 -> 7
        assert_eq!(estimate_detour_minutes(0.7, 0.5), 7.0);
        // 2.2 km -> 3.3 min + 5 = 8.3 -> 8
        assert_eq!(estimate_detour_minutes(1.1, 1.1), 8.0);
    }

    #[test]
    fn linear_estimator_matches_free_function() {
        let estimator = LinearDetourEstimator;
        assert_eq!(
            estimator.estimate_minutes(1.3, 0.4),
            estimate_detour_minutes(1.3, 0.4)
        );
    }
}
