//! Geographic primitives: haversine distances and point-to-segment
//! projection.
//!
//! All coordinates are WGS84 degrees. Distances are meters on a sphere of
//! mean Earth radius. Projection uses an equirectangular local approximation
//! (longitude scaled by the cosine of latitude), which stays consistent with
//! the haversine distances at city scale; the network this serves spans a few
//! tens of kilometers, far from the antimeridian.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance in meters between two points (haversine formula).
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Closest point on the finite segment `[start, end]` to `p`.
///
/// Computed in a local equirectangular plane anchored at the segment: latitude
/// maps to y directly, longitude to x scaled by `cos` of the segment's mean
/// latitude. If the segment is degenerate (`start == end`) the projection is
/// `start` itself.
pub fn project_onto_segment(p: GeoPoint, start: GeoPoint, end: GeoPoint) -> GeoPoint {
    let mean_lat = ((start.lat + end.lat) / 2.0).to_radians();
    let lon_scale = mean_lat.cos();

    let px = (p.lon - start.lon) * lon_scale;
    let py = p.lat - start.lat;
    let sx = (end.lon - start.lon) * lon_scale;
    let sy = end.lat - start.lat;

    let len_sq = sx * sx + sy * sy;
    if len_sq == 0.0 {
        return start;
    }

    let t = ((px * sx + py * sy) / len_sq).clamp(0.0, 1.0);

    GeoPoint {
        lat: start.lat + t * sy,
        lon: start.lon + t * sx / lon_scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_one_degree_longitude_at_equator() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let d = haversine_distance(a, b);
        // 1 degree of longitude at the equator is ~111.2 km
        assert!((d - 111_195.0).abs() / 111_195.0 < 0.005, "got {d}");
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        let p = GeoPoint::new(44.4268, 26.1025);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn haversine_symmetric() {
        let a = GeoPoint::new(44.4268, 26.1025);
        let b = GeoPoint::new(44.4795, 26.0834);
        assert_eq!(haversine_distance(a, b), haversine_distance(b, a));
    }

    #[test]
    fn haversine_known_city_distance() {
        // Piata Unirii to Piata Victoriei, roughly 3.5 km
        let a = GeoPoint::new(44.4268, 26.1025);
        let b = GeoPoint::new(44.4525, 26.0855);
        let d = haversine_distance(a, b);
        assert!(d > 3_000.0 && d < 4_000.0, "got {d}");
    }

    #[test]
    fn projection_of_point_on_segment_is_identity() {
        let start = GeoPoint::new(0.0, 0.0);
        let end = GeoPoint::new(0.0, 1.0);
        let p = GeoPoint::new(0.0, 0.5);
        let proj = project_onto_segment(p, start, end);
        assert!(haversine_distance(p, proj) < 0.001);
    }

    #[test]
    fn projection_clamps_to_segment_start() {
        let start = GeoPoint::new(0.0, 0.0);
        let end = GeoPoint::new(0.0, 1.0);
        let p = GeoPoint::new(0.0, -0.5);
        let proj = project_onto_segment(p, start, end);
        assert!(haversine_distance(proj, start) < 0.001);
    }

    #[test]
    fn projection_clamps_to_segment_end() {
        let start = GeoPoint::new(0.0, 0.0);
        let end = GeoPoint::new(0.0, 1.0);
        let p = GeoPoint::new(0.0, 1.5);
        let proj = project_onto_segment(p, start, end);
        assert!(haversine_distance(proj, end) < 0.001);
    }

    #[test]
    fn projection_perpendicular_drop() {
        let start = GeoPoint::new(0.0, 0.0);
        let end = GeoPoint::new(0.0, 1.0);
        let p = GeoPoint::new(0.1, 0.5);
        let proj = project_onto_segment(p, start, end);
        assert!((proj.lat - 0.0).abs() < 1e-9);
        assert!((proj.lon - 0.5).abs() < 1e-9);
    }

    #[test]
    fn projection_degenerate_segment_returns_endpoint() {
        let x = GeoPoint::new(44.43, 26.10);
        let p = GeoPoint::new(45.0, 27.0);
        assert_eq!(project_onto_segment(p, x, x), x);
    }

    #[test]
    fn projection_accounts_for_longitude_compression() {
        // At 60N a degree of longitude is half a degree of latitude. A point
        // due north of the segment midpoint must project onto the midpoint,
        // not drift toward an endpoint.
        let start = GeoPoint::new(60.0, 10.0);
        let end = GeoPoint::new(60.0, 11.0);
        let p = GeoPoint::new(60.2, 10.5);
        let proj = project_onto_segment(p, start, end);
        assert!((proj.lon - 10.5).abs() < 1e-9);
        assert!((proj.lat - 60.0).abs() < 1e-9);
    }
}
