//! Composite 0-100 match score.

/// Points lost per kilometre of combined pickup + dropoff distance.
const DISTANCE_PENALTY_PER_KM: f64 = 25.0;

/// Proximity component: 100 at zero distance, 0 at 4 km combined or more.
pub fn distance_score(pickup_distance_km: f64, dropoff_distance_km: f64) -> f64 {
    (100.0 - (pickup_distance_km + dropoff_distance_km) * DISTANCE_PENALTY_PER_KM).max(0.0)
}

/// Detour component: 100 at zero minutes, 0 at `max_detour_minutes`.
pub fn detour_score(detour_minutes: f64, max_detour_minutes: u32) -> f64 {
    (100.0 - (detour_minutes / f64::from(max_detour_minutes)) * 100.0).max(0.0)
}

/// Mean of the two components, rounded to two decimals.
pub fn match_score(
    pickup_distance_km: f64,
    dropoff_distance_km: f64,
    detour_minutes: f64,
    max_detour_minutes: u32,
) -> f64 {
    let combined = (distance_score(pickup_distance_km, dropoff_distance_km)
        + detour_score(detour_minutes, max_detour_minutes))
        / 2.0;
    round_to_hundredths(combined)
}

pub(crate) fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_match_scores_100_on_distance() {
        assert_eq!(distance_score(0.0, 0.0), 100.0);
    }

    #[test]
    fn distance_score_floors_at_zero() {
        assert_eq!(distance_score(3.0, 2.0), 0.0);
    }

    #[test]
    fn detour_score_is_linear_in_minutes() {
        assert_eq!(detour_score(0.0, 15), 100.0);
        assert!((detour_score(5.0, 15) - 66.666_666).abs() < 1e-4);
        assert_eq!(detour_score(15.0, 15), 0.0);
        assert_eq!(detour_score(30.0, 15), 0.0);
    }

    #[test]
    fn composite_is_rounded_mean() {
        // distance 100, detour 66.67 -> 83.33
        assert_eq!(match_score(0.0, 0.0, 5.0, 15), 83.33);
        // distance 75, detour 60 -> 67.5
        assert_eq!(match_score(0.5, 0.5, 6.0, 15), 67.5);
    }
}
