use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Network error: {0}")]
    NetworkMessage(String),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("feed still stale after {attempts} poll attempts")]
    Stale { attempts: u32 },
    #[error("feed unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },
}
