use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::geo::GeoPoint;
use crate::providers::fleet::classes::{category_for_line, VehicleCategory};

use super::error::GtfsError;

/// One line of the network as described by `routes.txt`.
///
/// Keyed by `route_short_name` (the rider-facing line number); `category` is
/// derived from the line-number classification and backs the enricher's
/// fallback when a vehicle has no usable fleet identity.
#[derive(Debug, Clone, PartialEq)]
pub struct LineInfo {
    pub route_id: String,
    pub color: Option<String>,
    pub category: VehicleCategory,
}

/// The in-memory static GTFS dataset: raw shape point lists, stop locations,
/// and the line catalog.
///
/// Shape points are kept raw here; [`ShapePolyline`](super::ShapePolyline)
/// instances with cumulative distances are built lazily per key by the
/// provider.
pub struct GtfsStatic {
    pub shapes: HashMap<String, Vec<GeoPoint>>,
    pub stops: HashMap<String, GeoPoint>,
    pub lines: HashMap<String, LineInfo>,
}

/// Load the three static GTFS files into memory (blocking, call on
/// spawn_blocking).
pub fn load_static(
    shapes_path: &Path,
    stops_path: &Path,
    routes_path: &Path,
) -> Result<GtfsStatic, GtfsError> {
    let shapes = parse_shapes(std::fs::File::open(shapes_path)?)?;
    info!(count = shapes.len(), "Parsed GTFS shapes");

    let stops = parse_stops(std::fs::File::open(stops_path)?)?;
    info!(count = stops.len(), "Parsed GTFS stops");

    let lines = parse_routes(std::fs::File::open(routes_path)?)?;
    info!(count = lines.len(), "Parsed GTFS routes");

    Ok(GtfsStatic {
        shapes,
        stops,
        lines,
    })
}

/// Parse `shapes.txt` into per-key point lists ordered by
/// `shape_pt_sequence`.
///
/// Sequence numbers define the direction of travel; points are never
/// re-sorted by coordinate. Rows with an unparseable coordinate or sequence
/// are skipped.
pub fn parse_shapes<R: Read>(reader: R) -> Result<HashMap<String, Vec<GeoPoint>>, GtfsError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let idx_id = headers
        .iter()
        .position(|h| h == "shape_id")
        .ok_or_else(|| GtfsError::ParseError("shapes.txt missing shape_id".into()))?;
    let idx_lat = headers
        .iter()
        .position(|h| h == "shape_pt_lat")
        .ok_or_else(|| GtfsError::ParseError("shapes.txt missing shape_pt_lat".into()))?;
    let idx_lon = headers
        .iter()
        .position(|h| h == "shape_pt_lon")
        .ok_or_else(|| GtfsError::ParseError("shapes.txt missing shape_pt_lon".into()))?;
    let idx_seq = headers
        .iter()
        .position(|h| h == "shape_pt_sequence")
        .ok_or_else(|| GtfsError::ParseError("shapes.txt missing shape_pt_sequence".into()))?;

    let mut raw: HashMap<String, Vec<(i64, GeoPoint)>> = HashMap::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result?;
        let shape_id = record.get(idx_id).unwrap_or("").to_string();
        if shape_id.is_empty() {
            skipped += 1;
            continue;
        }
        let lat = record.get(idx_lat).and_then(|s| s.parse::<f64>().ok());
        let lon = record.get(idx_lon).and_then(|s| s.parse::<f64>().ok());
        let seq = record.get(idx_seq).and_then(|s| s.parse::<i64>().ok());
        let (Some(lat), Some(lon), Some(seq)) = (lat, lon, seq) else {
            skipped += 1;
            continue;
        };
        raw.entry(shape_id)
            .or_default()
            .push((seq, GeoPoint::new(lat, lon)));
    }
    if skipped > 0 {
        warn!(skipped, "Skipped shapes.txt records (empty/unparseable)");
    }

    let mut shapes = HashMap::with_capacity(raw.len());
    for (shape_id, mut points) in raw {
        points.sort_by_key(|(seq, _)| *seq);
        shapes.insert(shape_id, points.into_iter().map(|(_, p)| p).collect());
    }
    Ok(shapes)
}

/// Parse `stops.txt` into a `stop_id -> location` lookup.
pub fn parse_stops<R: Read>(reader: R) -> Result<HashMap<String, GeoPoint>, GtfsError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let idx_id = headers
        .iter()
        .position(|h| h == "stop_id")
        .ok_or_else(|| GtfsError::ParseError("stops.txt missing stop_id".into()))?;
    let idx_lat = headers
        .iter()
        .position(|h| h == "stop_lat")
        .ok_or_else(|| GtfsError::ParseError("stops.txt missing stop_lat".into()))?;
    let idx_lon = headers
        .iter()
        .position(|h| h == "stop_lon")
        .ok_or_else(|| GtfsError::ParseError("stops.txt missing stop_lon".into()))?;

    let mut stops = HashMap::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result?;
        let stop_id = record.get(idx_id).unwrap_or("").trim().to_string();
        let lat = record.get(idx_lat).and_then(|s| s.parse::<f64>().ok());
        let lon = record.get(idx_lon).and_then(|s| s.parse::<f64>().ok());
        let (Some(lat), Some(lon)) = (lat, lon) else {
            skipped += 1;
            continue;
        };
        if stop_id.is_empty() {
            skipped += 1;
            continue;
        }
        stops.insert(stop_id, GeoPoint::new(lat, lon));
    }
    if skipped > 0 {
        warn!(skipped, "Skipped stops.txt records (empty/unparseable)");
    }
    Ok(stops)
}

/// Parse `routes.txt` into the line catalog keyed by `route_short_name`.
pub fn parse_routes<R: Read>(reader: R) -> Result<HashMap<String, LineInfo>, GtfsError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let idx_id = headers
        .iter()
        .position(|h| h == "route_id")
        .ok_or_else(|| GtfsError::ParseError("routes.txt missing route_id".into()))?;
    let idx_short = headers
        .iter()
        .position(|h| h == "route_short_name")
        .ok_or_else(|| GtfsError::ParseError("routes.txt missing route_short_name".into()))?;
    let idx_color = headers.iter().position(|h| h == "route_color");

    let mut lines = HashMap::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result?;
        let route_id = record.get(idx_id).unwrap_or("").to_string();
        let short_name = record.get(idx_short).unwrap_or("").to_string();
        if route_id.is_empty() || short_name.is_empty() {
            skipped += 1;
            continue;
        }
        let color = idx_color
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        let category = category_for_line(&short_name);
        lines.insert(
            short_name,
            LineInfo {
                route_id,
                color,
                category,
            },
        );
    }
    if skipped > 0 {
        warn!(skipped, "Skipped routes.txt records with missing ids");
    }
    Ok(lines)
}
