//! Vehicle classification data: line-number categories and the id-range
//! class table.
//!
//! The range table, type-to-image map, and no-AC type set are operator data,
//! loaded from a YAML file rather than hardcoded, so fleet changes don't
//! require a redeploy.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::FleetError;

/// Broad vehicle category, derived from the line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleCategory {
    Tram,
    Trolleybus,
    Bus,
    Unknown,
}

impl VehicleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleCategory::Tram => "tram",
            VehicleCategory::Trolleybus => "trolleybus",
            VehicleCategory::Bus => "bus",
            VehicleCategory::Unknown => "unknown",
        }
    }
}

/// Classify a line by its rider-facing number: trams run below 55,
/// trolleybuses between 61 and 99, buses from 100 up. Non-numeric line names
/// (night and metropolitan lines) are buses.
pub fn category_for_line(short_name: &str) -> VehicleCategory {
    let Ok(number) = short_name.trim().parse::<i64>() else {
        return VehicleCategory::Bus;
    };
    if number < 55 {
        VehicleCategory::Tram
    } else if number > 60 && number < 100 {
        VehicleCategory::Trolleybus
    } else if number >= 100 {
        VehicleCategory::Bus
    } else {
        VehicleCategory::Unknown
    }
}

/// One closed id range mapping to a vehicle type and image.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassRange {
    pub min: i64,
    pub max: i64,
    pub vehicle_type: String,
    pub image: String,
}

impl ClassRange {
    pub fn contains(&self, id: i64) -> bool {
        id >= self.min && id <= self.max
    }
}

/// The operator-maintained classification tables.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassTable {
    /// Ids at or below this value are resolved through the fleet roster
    /// before the range table is consulted.
    #[serde(default = "ClassTable::default_roster_id_max")]
    pub roster_id_max: i64,
    pub ranges: Vec<ClassRange>,
    /// Vehicle type -> image URL, for roster-resolved types.
    pub type_images: HashMap<String, String>,
    /// Types that never have air conditioning.
    #[serde(default)]
    pub no_ac_types: Vec<String>,
    /// Image for roster types with no entry in `type_images`.
    pub fallback_image: String,
    /// Image for vehicles with no resolved identity.
    pub unknown_image: String,
}

impl ClassTable {
    fn default_roster_id_max() -> i64 {
        4100
    }

    pub fn load(path: &Path) -> Result<Self, FleetError> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FleetError> {
        let table: ClassTable = serde_yaml::from_reader(reader)?;
        table.validate()?;
        Ok(table)
    }

    /// Ranges must not overlap; an overlap is a data error, not a tie to
    /// break at lookup time.
    pub fn validate(&self) -> Result<(), FleetError> {
        let mut sorted: Vec<&ClassRange> = self.ranges.iter().collect();
        sorted.sort_by_key(|r| r.min);
        for pair in sorted.windows(2) {
            if pair[1].min <= pair[0].max {
                return Err(FleetError::DataError(format!(
                    "ranges {}-{} and {}-{} overlap",
                    pair[0].min, pair[0].max, pair[1].min, pair[1].max
                )));
            }
        }
        for range in &self.ranges {
            if range.min > range.max {
                return Err(FleetError::DataError(format!(
                    "range {}-{} is inverted",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }

    /// First range containing `id`, if any.
    pub fn range_for(&self, id: i64) -> Option<&ClassRange> {
        self.ranges.iter().find(|r| r.contains(id))
    }

    pub fn image_for_type(&self, vehicle_type: &str) -> &str {
        self.type_images
            .get(vehicle_type)
            .map(String::as_str)
            .unwrap_or(&self.fallback_image)
    }

    pub fn is_no_ac_type(&self, vehicle_type: &str) -> bool {
        self.no_ac_types.iter().any(|t| t == vehicle_type)
    }
}
