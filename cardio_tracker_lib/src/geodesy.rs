use crate::geo_fix::GeoFix;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.;

/// Great-circle distance in meters between two (latitude, longitude) pairs given in degrees.
pub fn haversine_distance(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let d_lat = (p2.0 - p1.0).to_radians();
    let d_lon = (p2.1 - p1.1).to_radians();
    let lat1 = p1.0.to_radians();
    let lat2 = p2.0.to_radians();

    let a = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    let c = 2. * f64::atan2(f64::sqrt(a), f64::sqrt(1. - a));

    EARTH_RADIUS_M * c
}

pub fn distance_between(a: &GeoFix, b: &GeoFix) -> f64 {
    haversine_distance((a.latitude, a.longitude), (b.latitude, b.longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_along_the_equator() {
        let d = haversine_distance((0., 0.), (0., 1.));
        assert!((d - 111_195.).abs() < 1., "got {d}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_distance((0., 0.), (1., 0.));
        assert!((d - 111_195.).abs() < 1., "got {d}");
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_distance((56.15, 10.2), (56.15, 10.2)), 0.);
    }

    #[test]
    fn symmetric() {
        let a = (40.122151, 44.658078);
        let b = (56.158405, 10.206034);
        assert_eq!(haversine_distance(a, b), haversine_distance(b, a));
    }

    #[test]
    fn antipodal_points() {
        let d = haversine_distance((0., 0.), (0., 180.));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1e-6);
    }
}
