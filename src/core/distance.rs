//! Distance calculations
//!
//! Edge lengths use a plane projection (equirectangular approximation with
//! longitudes shrunk by the cosine of the mean latitude). That is accurate for
//! the short segments of a road graph and cheap enough to run per request.
//! Query distances use the haversine formula.

use geo::HaversineDistance;
use geo::Point;

use crate::core::geometry::{GeoPoint, PointList};

/// Mean earth radius in metres
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let p1 = Point::new(lon1, lat1);
    let p2 = Point::new(lon2, lat2);
    p1.haversine_distance(&p2)
}

/// Plane-projected distance in metres
pub fn plane_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    EARTH_RADIUS_M * plane_normalized_distance(lat1, lon1, lat2, lon2).sqrt()
}

/// Squared distance in radians, only good for comparisons
pub fn plane_normalized_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let left = ((lat1 + lat2) / 2.0).to_radians().cos() * d_lon;
    d_lat * d_lat + left * left
}

/// Plane distance including the elevation difference
pub fn plane_distance_3d(a: GeoPoint, b: GeoPoint) -> f64 {
    let flat = plane_distance(a.lat, a.lon, b.lat, b.lon);
    if a.has_elevation() && b.has_elevation() {
        let d_ele = b.ele - a.ele;
        (flat * flat + d_ele * d_ele).sqrt()
    } else {
        flat
    }
}

/// Length of a polyline, summed segment by segment
pub fn point_list_distance(points: &PointList) -> f64 {
    points
        .as_slice()
        .windows(2)
        .map(|w| {
            if points.is_3d() {
                plane_distance_3d(w[0], w[1])
            } else {
                plane_distance(w[0].lat, w[0].lon, w[1].lat, w[1].lon)
            }
        })
        .sum()
}

/// Projection factor of `r` onto segment `a -> b` in the shrunk plane.
/// 0 is `a`, 1 is `b`; values outside `[0, 1]` fall beyond the segment.
pub fn projection_factor(r_lat: f64, r_lon: f64, a_lat: f64, a_lon: f64, b_lat: f64, b_lon: f64) -> f64 {
    let shrink = ((a_lat + b_lat) / 2.0).to_radians().cos();
    let a_lon = a_lon * shrink;
    let b_lon = b_lon * shrink;
    let r_lon = r_lon * shrink;

    let delta_lon = b_lon - a_lon;
    let delta_lat = b_lat - a_lat;
    let norm = delta_lon * delta_lon + delta_lat * delta_lat;
    if norm == 0.0 {
        return 0.0;
    }
    ((r_lon - a_lon) * delta_lon + (r_lat - a_lat) * delta_lat) / norm
}

/// Foot of the perpendicular from `r` onto the line through `a` and `b`
pub fn crossing_point_to_edge(
    r_lat: f64,
    r_lon: f64,
    a_lat: f64,
    a_lon: f64,
    b_lat: f64,
    b_lon: f64,
) -> (f64, f64) {
    let shrink = ((a_lat + b_lat) / 2.0).to_radians().cos();
    let a_lon_s = a_lon * shrink;
    let b_lon_s = b_lon * shrink;
    let r_lon_s = r_lon * shrink;

    let delta_lon = b_lon_s - a_lon_s;
    let delta_lat = b_lat - a_lat;

    if delta_lat == 0.0 {
        // horizontal edge
        return (a_lat, r_lon);
    }
    if delta_lon == 0.0 {
        // vertical edge
        return (r_lat, a_lon);
    }

    let factor = projection_factor(r_lat, r_lon, a_lat, a_lon, b_lat, b_lon);
    let c_lon = a_lon_s + factor * delta_lon;
    let c_lat = a_lat + factor * delta_lat;
    (c_lat, c_lon / shrink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_distance_matches_haversine_for_short_segments() {
        let plane = plane_distance(50.0, 4.0, 50.001, 4.001);
        let haversine = haversine_distance(50.0, 4.0, 50.001, 4.001);
        assert!((plane - haversine).abs() < 0.01, "{plane} vs {haversine}");
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = plane_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_normalized_distance_orders_like_distance() {
        let near = plane_normalized_distance(1.0, 1.0, 1.1, 1.0);
        let far = plane_normalized_distance(1.0, 1.0, 1.2, 1.0);
        assert!(near < far);
    }

    #[test]
    fn test_distance_3d_adds_elevation() {
        let a = GeoPoint::new_3d(0.0, 0.0, 0.0);
        let b = GeoPoint::new_3d(0.0, 0.0, 30.0);
        assert!((plane_distance_3d(a, b) - 30.0).abs() < 1e-9);

        let flat = GeoPoint::new(0.0, 0.0);
        assert_eq!(plane_distance_3d(flat, b), 0.0);
    }

    #[test]
    fn test_point_list_distance() {
        let pl = PointList::from_points(
            vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(1.0, 0.0),
                GeoPoint::new(2.0, 0.0),
            ],
            false,
        );
        let expected = plane_distance(0.0, 0.0, 2.0, 0.0);
        assert!((point_list_distance(&pl) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_crossing_point() {
        // segment from (1, 2.5) to (1.5, 1.5), query at (1.5, 2)
        let (lat, lon) = crossing_point_to_edge(1.5, 2.0, 1.0, 2.5, 1.5, 1.5);
        assert!((lat - 1.300019).abs() < 1e-6, "lat {lat}");
        assert!((lon - 1.899962).abs() < 1e-6, "lon {lon}");
    }

    #[test]
    fn test_crossing_point_axis_aligned() {
        assert_eq!(crossing_point_to_edge(1.0, 0.5, 0.0, 0.0, 0.0, 1.0), (0.0, 0.5));
        assert_eq!(crossing_point_to_edge(0.5, 1.0, 0.0, 0.0, 1.0, 0.0), (0.5, 0.0));
    }

    #[test]
    fn test_projection_factor() {
        assert!((projection_factor(0.0, 0.5, 0.0, 0.0, 0.0, 1.0) - 0.5).abs() < 1e-9);
        assert!(projection_factor(0.0, -1.0, 0.0, 0.0, 0.0, 1.0) < 0.0);
        assert!(projection_factor(0.0, 2.0, 0.0, 0.0, 0.0, 1.0) > 1.0);
    }
}
