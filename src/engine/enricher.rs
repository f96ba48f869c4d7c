//! Cross-references ranked vehicles with fleet metadata and passenger
//! telemetry.

use std::collections::HashSet;

use serde::Serialize;

use crate::geo::GeoPoint;
use crate::providers::fleet::classes::VehicleCategory;
use crate::providers::fleet::FleetCatalog;
use crate::providers::realtime::{Eta, PassengerIndex};

use super::ranker::RankedArrival;

/// A ranked arrival with fleet metadata attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedArrival {
    pub vehicle_id: Option<i64>,
    pub license_plate: String,
    pub position: GeoPoint,
    pub distance_m: f64,
    pub vehicle_type: String,
    pub ac_available: bool,
    pub image: String,
    /// Passenger count from the telemetry dataset. `None` means unreported;
    /// zero is a real (empty vehicle) value.
    pub on_board: Option<i64>,
    pub eta: Option<Eta>,
}

/// Join one ranked vehicle against the passenger dataset and fleet catalog.
///
/// The license plate joins the telemetry dataset first; a dataset hit also
/// supplies the authoritative fleet id. Vehicles that end up with no usable
/// id fall back to the line's category for type, the unknown image, and no
/// AC.
pub fn enrich(
    ranked: RankedArrival,
    passengers: &PassengerIndex,
    fleet: &FleetCatalog,
    faulty_ids: &HashSet<i64>,
    line_category: VehicleCategory,
    eta: Option<Eta>,
) -> EnrichedArrival {
    let record = passengers.get(&ranked.license_plate);
    let vehicle_id = record
        .and_then(|r| r.vehicle_id)
        .or(ranked.vehicle_id);
    let on_board = record.and_then(|r| r.on_board);

    let (vehicle_type, image, ac_available) = match vehicle_id {
        None => (
            line_category.as_str().to_string(),
            fleet.classes().unknown_image.clone(),
            false,
        ),
        Some(id) => {
            let resolved = fleet.resolve(id);
            let ac = !faulty_ids.contains(&id) && !fleet.classes().is_no_ac_type(&resolved.vehicle_type);
            (resolved.vehicle_type, resolved.image, ac)
        }
    };

    EnrichedArrival {
        vehicle_id,
        license_plate: ranked.license_plate,
        position: ranked.position,
        distance_m: ranked.distance_m,
        vehicle_type,
        ac_available,
        image,
        on_board,
        eta,
    }
}
