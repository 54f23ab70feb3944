//! Distance and bearing between coordinates.
//!
//! Both are measured along the geodesic on the WGS-84 ellipsoid.

use ::geo::{Bearing, Distance, Geodesic, Point};
use uyir_shared::GeoPoint;

fn to_point(p: GeoPoint) -> Point {
    Point::new(p.lng, p.lat)
}

/// Geodesic distance in meters.
pub fn geodesic_distance_m(from: GeoPoint, to: GeoPoint) -> f64 {
    Geodesic.distance(to_point(from), to_point(to))
}

/// Geodesic distance in kilometers.
pub fn geodesic_distance_km(from: GeoPoint, to: GeoPoint) -> f64 {
    geodesic_distance_m(from, to) / 1000.0
}

/// Initial bearing from `from` towards `to`, degrees in [0, 360).
pub fn initial_bearing_deg(from: GeoPoint, to: GeoPoint) -> f64 {
    Geodesic.bearing(to_point(from), to_point(to)).rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coincident_points() {
        let p = GeoPoint::new(13.05, 80.25);
        assert!(geodesic_distance_m(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_equator_degree() {
        // One degree of longitude on the equator is a * pi / 180.
        let d = geodesic_distance_m(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        assert!((d - 111_319.49).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn test_chennai_short_hop() {
        let km = geodesic_distance_km(GeoPoint::new(13.05, 80.25), GeoPoint::new(13.06, 80.26));
        assert!(km > 1.5 && km < 1.6, "got {}", km);
    }

    #[test]
    fn test_symmetry() {
        let a = GeoPoint::new(13.0827, 80.2707);
        let b = GeoPoint::new(12.8230, 80.0459);
        assert!((geodesic_distance_m(a, b) - geodesic_distance_m(b, a)).abs() < 1e-6);
    }

    #[test]
    fn test_near_antipodal() {
        let d = geodesic_distance_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.5, 179.7));
        assert!(d.is_finite());
        assert!(d > 19_900.0 && d < 20_050.0, "got {}", d);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        let close = |got: f64, want: f64| {
            let diff = (got - want).abs();
            diff.min(360.0 - diff) < 1e-6
        };
        assert!(close(initial_bearing_deg(origin, GeoPoint::new(1.0, 0.0)), 0.0));
        assert!(close(initial_bearing_deg(origin, GeoPoint::new(0.0, 1.0)), 90.0));
        assert!(close(initial_bearing_deg(origin, GeoPoint::new(-1.0, 0.0)), 180.0));
        assert!(close(initial_bearing_deg(origin, GeoPoint::new(0.0, -1.0)), 270.0));
    }
}
