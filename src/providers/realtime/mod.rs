//! Realtime feed access: vehicle positions, passenger telemetry, and
//! arrival-time estimates.
//!
//! The feeds are external collaborators; this module owns the HTTP client,
//! fix validation, and the bounded freshness loop. The loop never blocks
//! forever: after the configured attempt budget it either degrades to the
//! last (stale) batch or fails, per the `fail_on_stale` policy.

pub mod error;
pub mod types;

use std::future::Future;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{EtaConfig, FeedConfig, FreshnessConfig};

use error::FeedError;
use types::{collect_fixes, DatasetEntity, FeedEntity, VehicleFix};

pub use types::{Eta, PassengerIndex, PassengerRecord};

/// A fix is fresh when its timestamp is within the cooldown window of `now`.
/// Timestamps from the future (clock skew upstream) count as fresh.
pub(crate) fn is_fresh(timestamp: i64, now: i64, cooldown_secs: i64) -> bool {
    now - timestamp <= cooldown_secs
}

/// Poll the position feed until every fix for `(line_id, direction)` is
/// fresh, bounded by the configured attempt budget.
///
/// An empty batch is vacuously fresh (no vehicles on the line is a valid
/// answer). Transport failures are retried within the same budget; if no
/// batch was ever obtained the result is [`FeedError::Unavailable`]. A batch
/// that never turns fresh is returned anyway with a warning, unless
/// `fail_on_stale` asks for a hard [`FeedError::Stale`].
pub async fn poll_fresh<F, Fut>(
    mut fetch: F,
    line_id: &str,
    direction: u8,
    config: &FreshnessConfig,
) -> Result<Vec<VehicleFix>, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<FeedEntity>, FeedError>>,
{
    let mut last_batch: Option<Vec<VehicleFix>> = None;

    for attempt in 1..=config.max_poll_attempts {
        match fetch().await {
            Ok(entities) => {
                let fixes = collect_fixes(&entities, line_id, direction);
                let now = Utc::now().timestamp();
                if fixes
                    .iter()
                    .all(|f| is_fresh(f.timestamp, now, config.fix_cooldown_secs))
                {
                    return Ok(fixes);
                }
                debug!(line_id, attempt, "Vehicle fixes stale, re-polling");
                last_batch = Some(fixes);
            }
            Err(e) => {
                warn!(line_id, attempt, error = %e, "Vehicle position fetch failed");
            }
        }

        if attempt < config.max_poll_attempts {
            tokio::time::sleep(std::time::Duration::from_secs(config.poll_delay_secs)).await;
        }
    }

    match last_batch {
        Some(_) if config.fail_on_stale => Err(FeedError::Stale {
            attempts: config.max_poll_attempts,
        }),
        Some(fixes) => {
            warn!(
                line_id,
                attempts = config.max_poll_attempts,
                "Serving stale vehicle fixes after exhausting the poll budget"
            );
            Ok(fixes)
        }
        None => Err(FeedError::Unavailable {
            attempts: config.max_poll_attempts,
        }),
    }
}

/// HTTP client for the realtime collaborators.
pub struct FeedClient {
    client: reqwest::Client,
    config: FeedConfig,
}

impl FeedClient {
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent("tramline/0.1")
            .build()?;
        Ok(Self { client, config })
    }

    pub async fn vehicle_positions(&self) -> Result<Vec<FeedEntity>, FeedError> {
        self.get_json(&self.config.positions_url).await
    }

    pub async fn passenger_dataset(&self) -> Result<Vec<DatasetEntity>, FeedError> {
        self.get_json(&self.config.dataset_url).await
    }

    /// Raw arrival-time values for a stop and line, in vehicle order.
    pub async fn arrival_times(
        &self,
        stop_id: &str,
        line_id: &str,
    ) -> Result<Vec<serde_json::Value>, FeedError> {
        let url = format!("{}/{}/{}", self.config.arrivals_url, stop_id, line_id);
        self.get_json(&url).await
    }

    /// The arrival-times endpoint flaps under load; retry it a bounded
    /// number of times before giving up.
    pub async fn arrival_times_with_retry(
        &self,
        stop_id: &str,
        line_id: &str,
        config: &EtaConfig,
    ) -> Result<Vec<serde_json::Value>, FeedError> {
        for attempt in 1..=config.max_attempts {
            match self.arrival_times(stop_id, line_id).await {
                Ok(values) => return Ok(values),
                Err(e) => {
                    warn!(stop_id, line_id, attempt, error = %e, "Arrival times fetch failed");
                    if attempt < config.max_attempts {
                        tokio::time::sleep(std::time::Duration::from_secs(
                            config.retry_delay_secs,
                        ))
                        .await;
                    }
                }
            }
        }
        Err(FeedError::Unavailable {
            attempts: config.max_attempts,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let response = self
            .client
            .get(url)
            .timeout(std::time::Duration::from_secs(
                self.config.request_timeout_secs,
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::NetworkMessage(format!(
                "feed HTTP {}",
                response.status()
            )));
        }

        Ok(response.json::<T>().await?)
    }
}
