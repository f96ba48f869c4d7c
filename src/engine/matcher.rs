//! Nearest-segment matching of a point against a shape polyline.

use crate::geo::{self, GeoPoint};
use crate::providers::gtfs::shapes::ShapePolyline;

/// The result of projecting a point onto one segment of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Index of the matched segment (segment `i` runs from point `i` to
    /// point `i + 1`).
    pub segment_index: usize,
    /// The projected point on that segment.
    pub point: GeoPoint,
    /// Haversine distance from the input point to the projection, meters.
    pub distance_m: f64,
}

/// Project `point` onto the nearest segment of `shape`, subject to
/// `max_distance_m`.
///
/// Scans every segment and keeps the one with the smallest distance strictly
/// below the gate; ties go to the lowest segment index, since only a strict
/// improvement replaces the current best. Returns `None` when no segment is
/// within the gate. Pass `f64::INFINITY` for an ungated match.
pub fn match_to_shape(
    point: GeoPoint,
    shape: &ShapePolyline,
    max_distance_m: f64,
) -> Option<Projection> {
    let mut best: Option<Projection> = None;

    for i in 0..shape.segment_count() {
        let projected = geo::project_onto_segment(point, shape.point(i), shape.point(i + 1));
        let distance_m = geo::haversine_distance(point, projected);

        if distance_m < max_distance_m
            && best.as_ref().map_or(true, |b| distance_m < b.distance_m)
        {
            best = Some(Projection {
                segment_index: i,
                point: projected,
                distance_m,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(points: &[(f64, f64)]) -> ShapePolyline {
        ShapePolyline::build(
            "test".into(),
            points.iter().map(|&(lat, lon)| GeoPoint::new(lat, lon)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn matches_nearest_segment() {
        let shape = shape(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)]);
        let m = match_to_shape(GeoPoint::new(0.001, 2.5), &shape, f64::INFINITY).unwrap();
        assert_eq!(m.segment_index, 2);
        assert!((m.point.lon - 2.5).abs() < 1e-9);
    }

    #[test]
    fn gate_excludes_distant_points() {
        let shape = shape(&[(0.0, 0.0), (0.0, 1.0)]);
        // ~0.01 degrees of latitude is about 1.1 km off the shape
        let p = GeoPoint::new(0.01, 0.5);
        assert!(match_to_shape(p, &shape, 500.0).is_none());
        assert!(match_to_shape(p, &shape, 2_000.0).is_some());
    }

    #[test]
    fn gate_is_strict() {
        let shape = shape(&[(0.0, 0.0), (0.0, 1.0)]);
        let p = GeoPoint::new(0.001, 0.5);
        let m = match_to_shape(p, &shape, f64::INFINITY).unwrap();
        // a gate exactly at the measured distance excludes the match
        assert!(match_to_shape(p, &shape, m.distance_m).is_none());
        assert!(match_to_shape(p, &shape, m.distance_m + 0.001).is_some());
    }

    #[test]
    fn ties_go_to_the_lowest_segment_index() {
        // segments 0 and 2 trace the same geometry, so every point is
        // equidistant from both
        let shape = shape(&[(0.0, 0.0), (0.0, 1.0), (0.0, 0.0), (0.0, 1.0)]);
        let m = match_to_shape(GeoPoint::new(0.002, 0.5), &shape, f64::INFINITY).unwrap();
        assert_eq!(m.segment_index, 0);
    }

    #[test]
    fn point_on_shape_has_zero_distance() {
        let shape = shape(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]);
        let m = match_to_shape(GeoPoint::new(0.0, 1.5), &shape, f64::INFINITY).unwrap();
        assert_eq!(m.segment_index, 1);
        assert!(m.distance_m < 0.001);
    }
}
