//! Great-circle distance and distance ranking.

use common::{Coordinate, Facility, RankedFacility};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometers.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lng = (to.longitude - from.longitude).to_radians();
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Rank facilities by distance from `origin` and keep the nearest `k`.
///
/// The sort is stable: facilities at equal distance keep the order the
/// provider returned them in. Ranks start at 1.
pub fn rank_by_distance(origin: Coordinate, facilities: Vec<Facility>, k: usize) -> Vec<RankedFacility> {
    let mut with_distance: Vec<(Facility, f64)> = facilities
        .into_iter()
        .map(|f| {
            let d = haversine_km(origin, f.coordinate);
            (f, d)
        })
        .collect();

    with_distance.sort_by(|a, b| a.1.total_cmp(&b.1));

    with_distance
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(i, (facility, distance_km))| RankedFacility {
            facility,
            distance_km,
            rank: i as u32 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facility(id: &str, lat: f64, lon: f64) -> Facility {
        Facility {
            id: id.into(),
            name: id.into(),
            address: String::new(),
            coordinate: Coordinate::new(lat, lon),
            available_quota: 10,
            phone: None,
        }
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = Coordinate::new(26.0845, 119.3005);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_haversine_symmetric() {
        let pairs = [
            (Coordinate::new(26.0845, 119.3005), Coordinate::new(26.0534, 119.3123)),
            (Coordinate::new(-33.8688, 151.2093), Coordinate::new(51.5074, -0.1278)),
            (Coordinate::new(90.0, 0.0), Coordinate::new(-90.0, 180.0)),
            (Coordinate::new(0.0, -179.9), Coordinate::new(0.0, 179.9)),
        ];
        for (a, b) in pairs {
            assert_eq!(haversine_km(a, b), haversine_km(b, a), "{a} vs {b}");
        }
    }

    #[test]
    fn test_haversine_known_distances() {
        // One degree of latitude along a meridian.
        let d = haversine_km(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!((d - 111.195).abs() < 0.01, "got {d}");

        // Pole to pole is half the circumference.
        let d = haversine_km(Coordinate::new(90.0, 0.0), Coordinate::new(-90.0, 0.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);

        // 福建省立医院 -> 福建医科大学附属第一医院, about 3.6 km.
        let d = haversine_km(
            Coordinate::new(26.0845, 119.3005),
            Coordinate::new(26.0534, 119.3123),
        );
        assert!((3.4..3.8).contains(&d), "got {d}");
    }

    #[test]
    fn test_rank_keeps_nearest_k_regardless_of_input_order() {
        let origin = Coordinate::new(0.0, 0.0);
        let facilities = vec![
            facility("far", 0.05, 0.0),
            facility("nearest", 0.01, 0.0),
            facility("farthest", 0.09, 0.0),
            facility("middle", 0.03, 0.0),
            facility("second", 0.02, 0.0),
        ];

        let ranked = rank_by_distance(origin, facilities, 3);

        let ids: Vec<&str> = ranked.iter().map(|r| r.facility.id.as_str()).collect();
        assert_eq!(ids, ["nearest", "second", "middle"]);
        let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, [1, 2, 3]);
        assert!(ranked.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn test_rank_ties_keep_provider_order() {
        let origin = Coordinate::new(0.0, 0.0);
        let facilities = vec![
            facility("east", 0.0, 0.01),
            facility("west", 0.0, -0.01),
            facility("closer", 0.0, 0.005),
        ];

        let ranked = rank_by_distance(origin, facilities, 3);

        let ids: Vec<&str> = ranked.iter().map(|r| r.facility.id.as_str()).collect();
        assert_eq!(ids, ["closer", "east", "west"]);
    }

    #[test]
    fn test_coincident_facility_ranks_first_at_zero() {
        let origin = Coordinate::new(26.0845, 119.3005);
        let facilities = vec![
            facility("a", 26.0534, 119.3123),
            facility("here", 26.0845, 119.3005),
        ];

        let ranked = rank_by_distance(origin, facilities, 3);

        assert_eq!(ranked[0].facility.id, "here");
        assert_eq!(ranked[0].distance_km, 0.0);
        assert_eq!(ranked[0].distance_text(), "0.0km");
        assert_eq!(ranked.len(), 2);
    }
}
