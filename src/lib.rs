//! Real-time transit arrival engine.
//!
//! Matches live vehicle position fixes against GTFS route shapes and
//! answers, for a given stop, which vehicles on each line are actually
//! approaching, how far along the route they are, and what is known about
//! them (type, image, air conditioning, occupancy, estimated arrival).
//!
//! The crate is a library; the HTTP layer that serves its results is a
//! separate concern. Entry point: [`engine::ArrivalsEngine`], constructed
//! from a [`providers::gtfs::GtfsProvider`], a
//! [`providers::fleet::FleetCatalog`], the faulty-AC list, and a
//! [`providers::realtime::FeedClient`].

pub mod config;
pub mod engine;
pub mod geo;
pub mod providers;

pub use config::Config;
pub use engine::{ArrivalsEngine, EngineError, EnrichedArrival, LineQuery, StopArrivals};
pub use geo::GeoPoint;
