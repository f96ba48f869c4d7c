//! Fleet metadata: the vehicle roster, id-range classification, and the
//! faulty-AC list.

pub mod classes;
pub mod error;
pub mod faulty;

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::config::FleetConfig;

use classes::ClassTable;
use error::FleetError;

/// A vehicle identity resolved from fleet data.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVehicle {
    pub vehicle_type: String,
    pub image: String,
}

/// Static fleet data: park-number roster plus the id-range class table.
///
/// Low park numbers (trams) are resolved through the roster; everything else
/// goes through the manufacturer id-range table. Both are loaded data, never
/// code.
pub struct FleetCatalog {
    roster: HashMap<i64, String>,
    classes: ClassTable,
}

impl FleetCatalog {
    pub async fn load(config: &FleetConfig) -> Result<Self, FleetError> {
        let roster_path = config.roster_path.clone();
        let classes_path = config.classes_path.clone();
        let catalog = tokio::task::spawn_blocking(move || {
            let roster = parse_roster(std::fs::File::open(&roster_path)?)?;
            let classes = ClassTable::load(&classes_path)?;
            Ok::<_, FleetError>(FleetCatalog { roster, classes })
        })
        .await??;

        info!(
            roster = catalog.roster.len(),
            ranges = catalog.classes.ranges.len(),
            "Loaded fleet catalog"
        );
        Ok(catalog)
    }

    pub fn from_parts(roster: HashMap<i64, String>, classes: ClassTable) -> Self {
        Self { roster, classes }
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    /// Resolve type and image for a known (non-zero) vehicle id.
    ///
    /// Roster first for park numbers at or below `roster_id_max`, then the
    /// range table; unmatched ids get the unknown type and image.
    pub fn resolve(&self, vehicle_id: i64) -> ResolvedVehicle {
        if vehicle_id > 0 && vehicle_id <= self.classes.roster_id_max {
            if let Some(vehicle_type) = self.roster.get(&vehicle_id) {
                return ResolvedVehicle {
                    vehicle_type: vehicle_type.clone(),
                    image: self.classes.image_for_type(vehicle_type).to_string(),
                };
            }
        }

        if let Some(range) = self.classes.range_for(vehicle_id) {
            return ResolvedVehicle {
                vehicle_type: range.vehicle_type.clone(),
                image: range.image.clone(),
            };
        }

        ResolvedVehicle {
            vehicle_type: "Unknown".to_string(),
            image: self.classes.unknown_image.clone(),
        }
    }
}

/// Parse the fleet roster CSV (`park_number,vehicle_type`).
pub fn parse_roster<R: Read>(reader: R) -> Result<HashMap<i64, String>, FleetError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let idx_park = headers
        .iter()
        .position(|h| h == "park_number")
        .ok_or_else(|| FleetError::DataError("roster missing park_number column".into()))?;
    let idx_type = headers
        .iter()
        .position(|h| h == "vehicle_type")
        .ok_or_else(|| FleetError::DataError("roster missing vehicle_type column".into()))?;

    let mut roster = HashMap::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result?;
        let park = record.get(idx_park).and_then(|s| s.trim().parse::<i64>().ok());
        let vehicle_type = record.get(idx_type).unwrap_or("").trim().to_string();
        let Some(park) = park else {
            skipped += 1;
            continue;
        };
        if vehicle_type.is_empty() {
            skipped += 1;
            continue;
        }
        roster.insert(park, vehicle_type);
    }
    if skipped > 0 {
        warn!(skipped, "Skipped roster records (empty/unparseable)");
    }
    Ok(roster)
}

/// Convenience re-export so callers don't need to spell the full path.
pub use faulty::FaultyAcList;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> FleetCatalog {
        let roster_csv = "\
park_number,vehicle_type
17,V3A-93
201,Bucur LF
3501,Astra Imperio Metropolitan
";
        let roster = parse_roster(roster_csv.as_bytes()).unwrap();

        let yaml = r#"
roster_id_max: 4100
ranges:
  - { min: 4101, max: 4999, vehicle_type: "Citaro", image: "https://img.example/citaro.png" }
  - { min: 6400, max: 6720, vehicle_type: "Kent 12m", image: "https://img.example/kent12.png" }
type_images:
  "V3A-93": "https://img.example/v3a.png"
  "Bucur LF": "https://img.example/blf.png"
no_ac_types:
  - "V3A-93"
fallback_image: "https://img.example/default.png"
unknown_image: "https://img.example/unknown.png"
"#;
        let classes = ClassTable::from_reader(yaml.as_bytes()).unwrap();
        FleetCatalog::from_parts(roster, classes)
    }

    #[test]
    fn parse_roster_basic() {
        let csv = "park_number,vehicle_type\n17,V3A-93\nbad,Other\n42,\n";
        let roster = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[&17], "V3A-93");
    }

    #[test]
    fn resolve_via_roster() {
        let catalog = sample_catalog();
        let resolved = catalog.resolve(17);
        assert_eq!(resolved.vehicle_type, "V3A-93");
        assert_eq!(resolved.image, "https://img.example/v3a.png");
    }

    #[test]
    fn resolve_roster_type_without_image_uses_fallback() {
        let catalog = sample_catalog();
        let resolved = catalog.resolve(3501);
        assert_eq!(resolved.vehicle_type, "Astra Imperio Metropolitan");
        assert_eq!(resolved.image, "https://img.example/default.png");
    }

    #[test]
    fn resolve_via_range_table() {
        let catalog = sample_catalog();
        let resolved = catalog.resolve(4661);
        assert_eq!(resolved.vehicle_type, "Citaro");
        assert_eq!(resolved.image, "https://img.example/citaro.png");
    }

    #[test]
    fn resolve_low_id_missing_from_roster_falls_to_ranges_then_unknown() {
        let catalog = sample_catalog();
        // 999 is under roster_id_max but absent from the roster and from
        // every range
        let resolved = catalog.resolve(999);
        assert_eq!(resolved.vehicle_type, "Unknown");
        assert_eq!(resolved.image, "https://img.example/unknown.png");
    }

    #[test]
    fn resolve_unmatched_id_is_unknown() {
        let catalog = sample_catalog();
        let resolved = catalog.resolve(8000);
        assert_eq!(resolved.vehicle_type, "Unknown");
        assert_eq!(resolved.image, "https://img.example/unknown.png");
    }
}
