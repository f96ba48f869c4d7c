//! Along-shape distance computation and ranking of approaching vehicles.
//!
//! Every candidate fix ends in one of two terminal outcomes: an along-shape
//! distance to the stop, or `Past`, meaning the vehicle is off-route or already
//! beyond the stop and is excluded from the ranked list entirely.

use tracing::{debug, error};

use crate::config::MatchingConfig;
use crate::geo::{self, GeoPoint};
use crate::providers::gtfs::shapes::ShapePolyline;
use crate::providers::realtime::types::VehicleFix;

use super::error::EngineError;
use super::matcher::{self, Projection};

/// A projection within this distance of a segment's end vertex is counted as
/// sitting at the start of the next segment.
const SEGMENT_BOUNDARY_EPSILON_M: f64 = 0.01;

/// Terminal outcome for one vehicle candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrivalOutcome {
    /// Along-shape distance to the stop, meters.
    Approaching(f64),
    /// Off-route, or at/after the stop; excluded from ranking.
    Past,
}

/// A vehicle confirmed to be approaching the stop.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedArrival {
    pub vehicle_id: Option<i64>,
    pub license_plate: String,
    pub position: GeoPoint,
    pub distance_m: f64,
}

/// Resolve a projection to its position index on the shape.
///
/// The index names the segment the position sits on (`i` = between points
/// `i` and `i + 1`). A projection that lands exactly on a segment's end
/// vertex has completed that segment and belongs to the next one; at the
/// terminus this yields `segment_count`, ordering the position after every
/// real segment.
fn position_index(projection: &Projection, shape: &ShapePolyline) -> usize {
    let next = projection.segment_index + 1;
    if geo::haversine_distance(projection.point, shape.point(next)) < SEGMENT_BOUNDARY_EPSILON_M {
        next
    } else {
        projection.segment_index
    }
}

/// Compare a vehicle projection against the stop projection on one shape.
pub fn outcome_for(
    vehicle: &Projection,
    stop: &Projection,
    shape: &ShapePolyline,
) -> ArrivalOutcome {
    let vehicle_index = position_index(vehicle, shape);
    let stop_index = position_index(stop, shape);

    match vehicle_index.cmp(&stop_index) {
        std::cmp::Ordering::Less => {
            // whole segments between the two positions, plus the two
            // partial-segment offsets from each position's segment start
            let mut distance_m = shape.cumulative_distance_at(stop_index)
                - shape.cumulative_distance_at(vehicle_index);
            distance_m += geo::haversine_distance(shape.point(vehicle_index), vehicle.point);
            distance_m += geo::haversine_distance(shape.point(stop_index), stop.point);
            ArrivalOutcome::Approaching(distance_m)
        }
        // sharing the stop's segment counts as arriving; vehicles there are
        // not sub-ordered
        std::cmp::Ordering::Equal => ArrivalOutcome::Approaching(0.0),
        std::cmp::Ordering::Greater => ArrivalOutcome::Past,
    }
}

/// Rank a batch of fixes by along-shape distance to the stop.
///
/// Off-route and past vehicles are absent from the output, not sorted last.
/// The sort is stable: equal distances keep their input order, and a fixed
/// input always produces the same output.
pub fn rank(
    stop_id: &str,
    stop: GeoPoint,
    fixes: &[VehicleFix],
    shape: &ShapePolyline,
    config: &MatchingConfig,
) -> Result<Vec<RankedArrival>, EngineError> {
    let stop_gate = config.stop_gate_m.unwrap_or(f64::INFINITY);
    let Some(stop_projection) = matcher::match_to_shape(stop, shape, stop_gate) else {
        error!(
            stop_id,
            shape_key = shape.shape_id(),
            "Stop does not lie near the route shape"
        );
        return Err(EngineError::RouteShapeMismatch {
            stop_id: stop_id.to_string(),
            shape_key: shape.shape_id().to_string(),
        });
    };

    let mut ranked = Vec::new();
    let mut past = 0usize;

    for fix in fixes {
        let Some(vehicle_projection) =
            matcher::match_to_shape(fix.position, shape, config.vehicle_gate_m)
        else {
            past += 1;
            continue;
        };

        match outcome_for(&vehicle_projection, &stop_projection, shape) {
            ArrivalOutcome::Approaching(distance_m) => ranked.push(RankedArrival {
                vehicle_id: fix.vehicle_id,
                license_plate: fix.license_plate.clone(),
                position: fix.position,
                distance_m,
            }),
            ArrivalOutcome::Past => past += 1,
        }
    }

    ranked.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

    debug!(
        stop_id,
        shape_key = shape.shape_id(),
        candidates = fixes.len(),
        ranked = ranked.len(),
        past,
        "Ranked vehicle candidates"
    );

    Ok(ranked)
}
