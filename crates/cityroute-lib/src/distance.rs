/// Mean radius of Earth in meters, the value OSM tooling uses for
/// great-circle lengths.
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// Great-circle distance in meters between two latitude/longitude positions,
/// computed with the haversine formula.
pub fn great_circle_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1).to_radians() * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Position on the unit sphere for a latitude/longitude pair.
///
/// Euclidean (chord) distance between two such points grows monotonically
/// with their great-circle distance, so nearest-neighbour queries over these
/// coordinates answer great-circle nearest-neighbour questions exactly.
pub fn unit_sphere(lat: f64, lon: f64) -> [f64; 3] {
    let lat = lat.to_radians();
    let lon = lon.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(great_circle_m(10.76, 106.66, 10.76, 106.66), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = great_circle_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = great_circle_m(10.882311, 106.782409, 10.759388, 106.667391);
        let b = great_circle_m(10.759388, 106.667391, 10.882311, 106.782409);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn unit_sphere_points_have_unit_norm() {
        let [x, y, z] = unit_sphere(48.85, 2.35);
        assert!(((x * x + y * y + z * z) - 1.0).abs() < 1e-12);
    }
}
