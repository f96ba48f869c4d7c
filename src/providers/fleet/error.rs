use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("fleet data error: {0}")]
    DataError(String),
    #[error("vehicle id {0} outside the accepted range")]
    OutOfRange(i64),
    #[error("vehicle {0} is already on the list")]
    AlreadyListed(i64),
    #[error("vehicle {0} is not on the list")]
    NotListed(i64),
    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}
