//! Route shape polylines with precomputed along-shape distances.

use crate::geo::{self, GeoPoint};

/// The ordered polyline of one `(route, direction)` pair, plus the prefix sum
/// of segment lengths.
///
/// Point order is the physical direction of travel as given by the GTFS
/// `shape_pt_sequence` column. Instances are built once per shape key and
/// cached by [`GtfsProvider`](super::GtfsProvider); treat them as read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePolyline {
    shape_id: String,
    points: Vec<GeoPoint>,
    cumulative: Vec<f64>,
}

impl ShapePolyline {
    /// Build a polyline and its cumulative distances. Returns `None` for
    /// fewer than 2 points (no segment to project onto).
    pub(crate) fn build(shape_id: String, points: Vec<GeoPoint>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        let mut cumulative = Vec::with_capacity(points.len());
        cumulative.push(0.0);
        for window in points.windows(2) {
            let last = cumulative[cumulative.len() - 1];
            cumulative.push(last + geo::haversine_distance(window[0], window[1]));
        }

        Some(Self {
            shape_id,
            points,
            cumulative,
        })
    }

    pub fn shape_id(&self) -> &str {
        &self.shape_id
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> GeoPoint {
        self.points[index]
    }

    /// Number of segments, always `points.len() - 1`.
    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    /// Along-shape distance in meters from the first point to point `index`.
    pub fn cumulative_distance_at(&self, index: usize) -> f64 {
        self.cumulative[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_line() -> ShapePolyline {
        ShapePolyline::build(
            "10".into(),
            vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(0.0, 0.001),
                GeoPoint::new(0.0, 0.002),
                GeoPoint::new(0.0, 0.003),
            ],
        )
        .unwrap()
    }

    #[test]
    fn build_rejects_short_inputs() {
        assert!(ShapePolyline::build("x".into(), vec![]).is_none());
        assert!(ShapePolyline::build("x".into(), vec![GeoPoint::new(1.0, 1.0)]).is_none());
    }

    #[test]
    fn cumulative_starts_at_zero() {
        let shape = straight_line();
        assert_eq!(shape.cumulative_distance_at(0), 0.0);
    }

    #[test]
    fn cumulative_is_non_decreasing() {
        let shape = straight_line();
        for i in 1..shape.points().len() {
            assert!(shape.cumulative_distance_at(i) >= shape.cumulative_distance_at(i - 1));
        }
    }

    #[test]
    fn cumulative_matches_segment_sums() {
        let shape = straight_line();
        let seg = crate::geo::haversine_distance(shape.point(0), shape.point(1));
        assert!((shape.cumulative_distance_at(2) - 2.0 * seg).abs() < 1e-6);
        assert!((shape.cumulative_distance_at(3) - 3.0 * seg).abs() < 1e-6);
    }

    #[test]
    fn segment_count_is_point_count_minus_one() {
        assert_eq!(straight_line().segment_count(), 3);
    }

    #[test]
    fn duplicate_consecutive_points_keep_cumulative_flat() {
        let shape = ShapePolyline::build(
            "dup".into(),
            vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(0.0, 0.001),
                GeoPoint::new(0.0, 0.001),
                GeoPoint::new(0.0, 0.002),
            ],
        )
        .unwrap();
        assert_eq!(
            shape.cumulative_distance_at(1),
            shape.cumulative_distance_at(2)
        );
        assert!(shape.cumulative_distance_at(3) > shape.cumulative_distance_at(2));
    }
}
