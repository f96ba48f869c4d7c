use thiserror::Error;

use crate::providers::gtfs::error::GtfsError;
use crate::providers::realtime::error::FeedError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The stop does not lie near the shape at all: a data/configuration
    /// inconsistency (stop assigned to the wrong line or direction), not a
    /// transient condition.
    #[error("stop {stop_id} does not lie near shape {shape_key}")]
    RouteShapeMismatch { stop_id: String, shape_key: String },
    #[error(transparent)]
    Gtfs(#[from] GtfsError),
    #[error(transparent)]
    Feed(#[from] FeedError),
}
