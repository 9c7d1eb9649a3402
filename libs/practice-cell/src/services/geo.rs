// libs/practice-cell/src/services/geo.rs

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two WGS84 points, in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        assert!(haversine_km(51.5, -0.12, 51.5, -0.12).abs() < 1e-9);
    }

    #[test]
    fn london_to_bristol() {
        // Roughly 170 km as the crow flies.
        let d = haversine_km(51.5074, -0.1278, 51.4545, -2.5879);
        assert!((165.0..175.0).contains(&d), "got {}", d);
    }
}
