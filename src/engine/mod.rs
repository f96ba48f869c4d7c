//! The arrivals engine: ties route shapes, live fixes, and fleet data into
//! ranked, enriched per-line arrival lists.
//!
//! Per stop query the engine resolves the stop location once, snapshots the
//! passenger dataset and faulty-AC list, then fans out across the queried
//! lines; each line independently fetches fresh fixes, ranks them along its
//! shape, and enriches the survivors. A line failing (missing shape, dead
//! feed) fails only that line's slot in the response.

pub mod enricher;
pub mod error;
pub mod matcher;
pub mod ranker;

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::warn;

use crate::config::Config;
use crate::geo::GeoPoint;
use crate::providers::fleet::classes::{category_for_line, VehicleCategory};
use crate::providers::fleet::{FaultyAcList, FleetCatalog};
use crate::providers::gtfs::shapes::ShapePolyline;
use crate::providers::gtfs::GtfsProvider;
use crate::providers::realtime::types::collect_fixes;
use crate::providers::realtime::{poll_fresh, Eta, FeedClient, PassengerIndex};

pub use enricher::EnrichedArrival;
pub use error::EngineError;
pub use ranker::{ArrivalOutcome, RankedArrival};

/// One `(line, direction)` pair to check at a stop.
#[derive(Debug, Clone, PartialEq)]
pub struct LineQuery {
    /// GTFS route id, as used by the realtime feed.
    pub line_id: String,
    /// Rider-facing line number ("1", "25", "N109").
    pub name: String,
    /// 0 = outbound, 1 = inbound.
    pub direction: u8,
}

impl LineQuery {
    /// Shape keys concatenate route id and direction, one shape per
    /// direction of travel.
    pub fn shape_key(&self) -> String {
        format!("{}{}", self.line_id, self.direction)
    }
}

/// Per-line outcome within a stop query.
#[derive(Debug)]
pub struct LineArrivals {
    pub query: LineQuery,
    /// An empty list means no vehicle currently qualifies; that is a valid
    /// answer, not an error.
    pub arrivals: Result<Vec<EnrichedArrival>, EngineError>,
}

#[derive(Debug)]
pub struct StopArrivals {
    pub stop_id: String,
    pub lines: Vec<LineArrivals>,
}

/// A vehicle shown on the route overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteVehicle {
    pub vehicle_id: Option<i64>,
    pub license_plate: String,
    pub position: GeoPoint,
    pub vehicle_type: String,
    pub image: String,
}

/// Vehicles currently snapped to one direction of a route.
#[derive(Debug)]
pub struct DirectionVehicles {
    pub shape: Arc<ShapePolyline>,
    pub vehicles: Vec<RouteVehicle>,
}

#[derive(Debug)]
pub struct RouteVehicles {
    pub line_id: String,
    pub outbound: Result<DirectionVehicles, EngineError>,
    pub inbound: Result<DirectionVehicles, EngineError>,
}

pub struct ArrivalsEngine {
    gtfs: Arc<GtfsProvider>,
    fleet: Arc<FleetCatalog>,
    faulty: Arc<FaultyAcList>,
    feed: FeedClient,
    config: Config,
}

impl ArrivalsEngine {
    pub fn new(
        gtfs: Arc<GtfsProvider>,
        fleet: Arc<FleetCatalog>,
        faulty: Arc<FaultyAcList>,
        feed: FeedClient,
        config: Config,
    ) -> Self {
        Self {
            gtfs,
            fleet,
            faulty,
            feed,
            config,
        }
    }

    /// Ranked, enriched arrivals for every queried line at a stop.
    ///
    /// An unknown stop fails the whole query; per-line problems fail only
    /// that line's slot.
    pub async fn stop_arrivals(
        &self,
        stop_id: &str,
        lines: &[LineQuery],
    ) -> Result<StopArrivals, EngineError> {
        let stop_position = self.gtfs.stop_location(stop_id).await?;

        // Occupancy is enrichment, not a hard dependency; a dead dataset
        // only costs the on_board field.
        let passengers = match self.feed.passenger_dataset().await {
            Ok(entities) => PassengerIndex::from_entities(&entities),
            Err(e) => {
                warn!(error = %e, "Passenger dataset unavailable, arrivals will lack occupancy");
                PassengerIndex::default()
            }
        };
        let faulty_ids = self.faulty.snapshot().await;

        let passengers = &passengers;
        let faulty_ids = &faulty_ids;
        let line_futures = lines.iter().map(|query| async move {
            let arrivals = self
                .line_arrivals(stop_id, stop_position, query, passengers, faulty_ids)
                .await;
            if let Err(e) = &arrivals {
                warn!(line = %query.name, direction = query.direction, error = %e, "Line arrivals failed");
            }
            LineArrivals {
                query: query.clone(),
                arrivals,
            }
        });

        Ok(StopArrivals {
            stop_id: stop_id.to_string(),
            lines: join_all(line_futures).await,
        })
    }

    async fn line_arrivals(
        &self,
        stop_id: &str,
        stop_position: GeoPoint,
        query: &LineQuery,
        passengers: &PassengerIndex,
        faulty_ids: &HashSet<i64>,
    ) -> Result<Vec<EnrichedArrival>, EngineError> {
        let shape = self.gtfs.shape(&query.shape_key()).await?;

        let fixes = poll_fresh(
            || self.feed.vehicle_positions(),
            &query.line_id,
            query.direction,
            &self.config.freshness,
        )
        .await?;

        let ranked = ranker::rank(
            stop_id,
            stop_position,
            &fixes,
            &shape,
            &self.config.matching,
        )?;

        let etas: Vec<Option<Eta>> = match self
            .feed
            .arrival_times_with_retry(stop_id, &query.line_id, &self.config.eta)
            .await
        {
            Ok(raw) => raw
                .iter()
                .map(|v| Eta::from_raw(v, &self.config.eta.beyond_window_text))
                .collect(),
            Err(e) => {
                warn!(line = %query.name, error = %e, "Arrival times unavailable");
                Vec::new()
            }
        };

        Ok(assemble(
            ranked,
            &etas,
            passengers,
            &self.fleet,
            faulty_ids,
            category_for_line(&query.name),
            self.config.eta.eta_positions,
        ))
    }

    /// Vehicles currently on a route, grouped by direction, for the route
    /// overview. Uses the strict snap gate: a vehicle must be on the shape,
    /// not merely near it. No ranking and no ETAs here.
    pub async fn vehicles_on_route(
        &self,
        line_id: &str,
        line_name: &str,
    ) -> Result<RouteVehicles, EngineError> {
        let entities = self.feed.vehicle_positions().await.map_err(EngineError::from)?;

        let outbound = self
            .direction_vehicles(line_id, line_name, 0, &entities)
            .await;
        let inbound = self
            .direction_vehicles(line_id, line_name, 1, &entities)
            .await;

        Ok(RouteVehicles {
            line_id: line_id.to_string(),
            outbound,
            inbound,
        })
    }

    async fn direction_vehicles(
        &self,
        line_id: &str,
        line_name: &str,
        direction: u8,
        entities: &[crate::providers::realtime::types::FeedEntity],
    ) -> Result<DirectionVehicles, EngineError> {
        let shape = self.gtfs.shape(&format!("{line_id}{direction}")).await?;
        let category = category_for_line(line_name);

        let vehicles = collect_fixes(entities, line_id, direction)
            .into_iter()
            .filter_map(|fix| {
                matcher::match_to_shape(fix.position, &shape, self.config.matching.snap_gate_m)?;
                let (vehicle_type, image) = match fix.vehicle_id {
                    None => (
                        category.as_str().to_string(),
                        self.fleet.classes().unknown_image.clone(),
                    ),
                    Some(id) => {
                        let resolved = self.fleet.resolve(id);
                        (resolved.vehicle_type, resolved.image)
                    }
                };
                Some(RouteVehicle {
                    vehicle_id: fix.vehicle_id,
                    license_plate: fix.license_plate,
                    position: fix.position,
                    vehicle_type,
                    image,
                })
            })
            .collect();

        Ok(DirectionVehicles { shape, vehicles })
    }
}

/// Enrich a ranked list, attaching ETAs to the first `eta_positions`
/// vehicles in order.
fn assemble(
    ranked: Vec<RankedArrival>,
    etas: &[Option<Eta>],
    passengers: &PassengerIndex,
    fleet: &FleetCatalog,
    faulty_ids: &HashSet<i64>,
    line_category: VehicleCategory,
    eta_positions: usize,
) -> Vec<EnrichedArrival> {
    ranked
        .into_iter()
        .enumerate()
        .map(|(index, arrival)| {
            let eta = if index < eta_positions {
                etas.get(index).cloned().flatten()
            } else {
                None
            };
            enricher::enrich(arrival, passengers, fleet, faulty_ids, line_category, eta)
        })
        .collect()
}
