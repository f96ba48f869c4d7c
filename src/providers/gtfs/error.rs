use thiserror::Error;

#[derive(Debug, Error)]
pub enum GtfsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("GTFS parse error: {0}")]
    ParseError(String),
    #[error("GTFS data not loaded")]
    NotLoaded,
    #[error("no shape points for key {0}")]
    ShapeNotFound(String),
    #[error("stop {0} not found in stops data")]
    StopNotFound(String),
    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}
