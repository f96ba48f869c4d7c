pub mod fleet;
pub mod gtfs;
pub mod realtime;
