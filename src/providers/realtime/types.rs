//! Wire types for the realtime vehicle-position and passenger-telemetry
//! feeds.
//!
//! The upstream JSON nests GTFS-RT-style descriptors and is loose about
//! types (route ids arrive as strings or numbers depending on the endpoint
//! revision), so the identifier fields deserialize flexibly.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::geo::GeoPoint;

// --- Flexible scalar helpers ---

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(i64),
}

fn opt_flexible_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrNumber::Text(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

fn opt_flexible_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        StringOrNumber::Text(s) => s.trim().parse().ok(),
        StringOrNumber::Number(n) => Some(n),
    }))
}

// --- Vehicle position feed ---

#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntity {
    pub vehicle: Option<VehicleEnvelope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleEnvelope {
    pub trip: Option<TripDescriptor>,
    pub position: Option<Position>,
    #[serde(rename = "vehicle")]
    pub descriptor: Option<VehicleDescriptor>,
    /// Unix seconds of the fix.
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripDescriptor {
    #[serde(
        alias = "routeId",
        default,
        deserialize_with = "opt_flexible_string"
    )]
    pub route_id: Option<String>,
    #[serde(
        alias = "directionId",
        default,
        deserialize_with = "opt_flexible_i64"
    )]
    pub direction_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleDescriptor {
    #[serde(default, deserialize_with = "opt_flexible_i64")]
    pub th_id: Option<i64>,
    #[serde(
        alias = "licensePlate",
        default,
        deserialize_with = "opt_flexible_string"
    )]
    pub license_plate: Option<String>,
}

/// A validated live position fix for one vehicle.
///
/// Transient: produced fresh from each feed poll, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleFix {
    /// Fleet id; `None` when the feed reports no id (0 counts as no id).
    pub vehicle_id: Option<i64>,
    /// Empty when the feed omits the plate; the fix still ranks, it just
    /// won't join the passenger dataset.
    pub license_plate: String,
    pub position: GeoPoint,
    pub line_id: String,
    pub direction: u8,
    /// Unix seconds.
    pub timestamp: i64,
}

impl VehicleFix {
    /// Validate one feed entity into a fix. Returns `None` when a required
    /// field (trip, direction, position, timestamp) is missing.
    pub fn from_entity(entity: &FeedEntity) -> Option<Self> {
        let envelope = entity.vehicle.as_ref()?;
        let trip = envelope.trip.as_ref()?;
        let line_id = trip.route_id.clone()?;
        let direction = u8::try_from(trip.direction_id?).ok()?;
        let position = envelope.position.as_ref()?;
        let timestamp = envelope.timestamp?;

        let descriptor = envelope.descriptor.as_ref();
        let vehicle_id = descriptor.and_then(|d| d.th_id).filter(|id| *id != 0);
        let license_plate = descriptor
            .and_then(|d| d.license_plate.clone())
            .unwrap_or_default();

        Some(Self {
            vehicle_id,
            license_plate,
            position: GeoPoint::new(position.latitude, position.longitude),
            line_id,
            direction,
            timestamp,
        })
    }
}

/// Validate a feed batch and keep the fixes for one `(line, direction)`.
///
/// Entities without a vehicle payload are ignored (the feed mixes in other
/// entity kinds); vehicle entities missing required fields are dropped and
/// counted, never fatal to the batch.
pub fn collect_fixes(entities: &[FeedEntity], line_id: &str, direction: u8) -> Vec<VehicleFix> {
    let mut dropped = 0usize;
    let mut fixes = Vec::new();

    for entity in entities {
        if entity.vehicle.is_none() {
            continue;
        }
        match VehicleFix::from_entity(entity) {
            Some(fix) if fix.line_id == line_id && fix.direction == direction => fixes.push(fix),
            Some(_) => {}
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, line_id, "Dropped incomplete vehicle fixes");
    }
    fixes
}

// --- Passenger telemetry dataset ---

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEntity {
    pub vehicle: Option<DatasetEnvelope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEnvelope {
    #[serde(rename = "vehicle")]
    pub descriptor: Option<VehicleDescriptor>,
    pub passenger_info: Option<PassengerInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PassengerInfo {
    pub on_board: Option<i64>,
}

/// Per-plate record from the passenger telemetry dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PassengerRecord {
    /// The dataset's fleet id, authoritative over the position feed's.
    pub vehicle_id: Option<i64>,
    pub on_board: Option<i64>,
}

/// License-plate index over the passenger dataset.
#[derive(Debug, Default)]
pub struct PassengerIndex {
    by_plate: HashMap<String, PassengerRecord>,
}

impl PassengerIndex {
    pub fn from_entities(entities: &[DatasetEntity]) -> Self {
        let mut by_plate = HashMap::new();
        for entity in entities {
            let Some(envelope) = &entity.vehicle else {
                continue;
            };
            let Some(plate) = envelope
                .descriptor
                .as_ref()
                .and_then(|d| d.license_plate.clone())
                .filter(|p| !p.is_empty())
            else {
                continue;
            };
            let vehicle_id = envelope
                .descriptor
                .as_ref()
                .and_then(|d| d.th_id)
                .filter(|id| *id != 0);
            let on_board = envelope.passenger_info.as_ref().and_then(|p| p.on_board);
            by_plate.insert(
                plate,
                PassengerRecord {
                    vehicle_id,
                    on_board,
                },
            );
        }
        Self { by_plate }
    }

    pub fn get(&self, plate: &str) -> Option<&PassengerRecord> {
        self.by_plate.get(plate)
    }

    pub fn len(&self) -> usize {
        self.by_plate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_plate.is_empty()
    }
}

// --- Arrival time estimates ---

/// An estimated arrival, as reported by the times feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Eta {
    Minutes(i64),
    Text(String),
}

impl Eta {
    /// Map a raw feed value: numbers (or numeric strings) are minutes; the
    /// `"m"` marker means the arrival lies beyond the feed's forecast window
    /// and is replaced with the configured display text.
    pub fn from_raw(value: &serde_json::Value, beyond_window_text: &str) -> Option<Eta> {
        if let Some(n) = value.as_i64() {
            return Some(Eta::Minutes(n));
        }
        match value.as_str() {
            Some("m") => Some(Eta::Text(beyond_window_text.to_string())),
            Some(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .map(Eta::Minutes)
                .or_else(|| Some(Eta::Text(s.to_string()))),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity_json(route: serde_json::Value, direction: serde_json::Value) -> serde_json::Value {
        json!({
            "vehicle": {
                "trip": { "route_id": route, "direction_id": direction },
                "position": { "latitude": 44.43, "longitude": 26.10 },
                "vehicle": { "th_id": 4661, "license_plate": "B-123-STB" },
                "timestamp": 1_754_550_000
            }
        })
    }

    #[test]
    fn deserialize_entity_with_string_ids() {
        let entity: FeedEntity =
            serde_json::from_value(entity_json(json!("25"), json!("1"))).unwrap();
        let fix = VehicleFix::from_entity(&entity).unwrap();
        assert_eq!(fix.line_id, "25");
        assert_eq!(fix.direction, 1);
        assert_eq!(fix.vehicle_id, Some(4661));
        assert_eq!(fix.license_plate, "B-123-STB");
    }

    #[test]
    fn deserialize_entity_with_numeric_ids() {
        let entity: FeedEntity = serde_json::from_value(entity_json(json!(25), json!(0))).unwrap();
        let fix = VehicleFix::from_entity(&entity).unwrap();
        assert_eq!(fix.line_id, "25");
        assert_eq!(fix.direction, 0);
    }

    #[test]
    fn deserialize_entity_with_camel_case_keys() {
        let value = json!({
            "vehicle": {
                "trip": { "routeId": "40", "directionId": 0 },
                "position": { "latitude": 44.43, "longitude": 26.10 },
                "vehicle": { "th_id": 0, "licensePlate": "B-77-XYZ" },
                "timestamp": 1_754_550_000
            }
        });
        let entity: FeedEntity = serde_json::from_value(value).unwrap();
        let fix = VehicleFix::from_entity(&entity).unwrap();
        assert_eq!(fix.line_id, "40");
        // th_id 0 means no usable fleet id
        assert_eq!(fix.vehicle_id, None);
        assert_eq!(fix.license_plate, "B-77-XYZ");
    }

    #[test]
    fn fix_requires_position_and_timestamp() {
        let no_position = json!({
            "vehicle": {
                "trip": { "route_id": "25", "direction_id": 0 },
                "timestamp": 1_754_550_000
            }
        });
        let entity: FeedEntity = serde_json::from_value(no_position).unwrap();
        assert!(VehicleFix::from_entity(&entity).is_none());

        let no_timestamp = json!({
            "vehicle": {
                "trip": { "route_id": "25", "direction_id": 0 },
                "position": { "latitude": 44.43, "longitude": 26.10 }
            }
        });
        let entity: FeedEntity = serde_json::from_value(no_timestamp).unwrap();
        assert!(VehicleFix::from_entity(&entity).is_none());
    }

    #[test]
    fn collect_fixes_filters_line_and_direction() {
        let entities: Vec<FeedEntity> = vec![
            serde_json::from_value(entity_json(json!("25"), json!(0))).unwrap(),
            serde_json::from_value(entity_json(json!("25"), json!(1))).unwrap(),
            serde_json::from_value(entity_json(json!("40"), json!(0))).unwrap(),
            serde_json::from_value(json!({ "vehicle": null })).unwrap(),
            serde_json::from_value(json!({
                "vehicle": { "trip": { "route_id": "25", "direction_id": 0 } }
            }))
            .unwrap(),
        ];

        let fixes = collect_fixes(&entities, "25", 0);
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].line_id, "25");
        assert_eq!(fixes[0].direction, 0);
    }

    #[test]
    fn passenger_index_joins_by_plate() {
        let entities: Vec<DatasetEntity> = serde_json::from_value(json!([
            {
                "vehicle": {
                    "vehicle": { "th_id": 4661, "license_plate": "B-123-STB" },
                    "passenger_info": { "on_board": 0 }
                }
            },
            {
                "vehicle": {
                    "vehicle": { "th_id": 0, "license_plate": "B-456-STB" },
                    "passenger_info": { "on_board": 37 }
                }
            },
            { "vehicle": null }
        ]))
        .unwrap();

        let index = PassengerIndex::from_entities(&entities);
        assert_eq!(index.len(), 2);

        let first = index.get("B-123-STB").unwrap();
        assert_eq!(first.vehicle_id, Some(4661));
        // zero occupancy is a real value, not absence
        assert_eq!(first.on_board, Some(0));

        let second = index.get("B-456-STB").unwrap();
        assert_eq!(second.vehicle_id, None);
        assert_eq!(second.on_board, Some(37));

        assert!(index.get("B-999-STB").is_none());
    }

    #[test]
    fn eta_from_raw_values() {
        assert_eq!(Eta::from_raw(&json!(4), "17+ min"), Some(Eta::Minutes(4)));
        assert_eq!(Eta::from_raw(&json!("12"), "17+ min"), Some(Eta::Minutes(12)));
        assert_eq!(
            Eta::from_raw(&json!("m"), "17+ min"),
            Some(Eta::Text("17+ min".into()))
        );
        assert_eq!(
            Eta::from_raw(&json!("departing"), "17+ min"),
            Some(Eta::Text("departing".into()))
        );
        assert_eq!(Eta::from_raw(&json!(null), "17+ min"), None);
    }

    #[test]
    fn eta_serializes_untagged() {
        assert_eq!(serde_json::to_string(&Eta::Minutes(7)).unwrap(), "7");
        assert_eq!(
            serde_json::to_string(&Eta::Text("17+ min".into())).unwrap(),
            "\"17+ min\""
        );
    }
}
