//! The operator-maintained list of vehicles with broken air conditioning.
//!
//! Backed by a JSON file of numeric vehicle ids. The enricher only reads the
//! list; mutation happens through [`add`](FaultyAcList::add) /
//! [`remove`](FaultyAcList::remove), called by an operator-facing
//! collaborator.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::error::FleetError;

/// Accepted vehicle id range, exclusive on both ends.
const MIN_VEHICLE_ID: i64 = 0;
const MAX_VEHICLE_ID: i64 = 9000;

pub struct FaultyAcList {
    path: PathBuf,
    ids: RwLock<HashSet<i64>>,
}

impl FaultyAcList {
    /// Load the list from disk. A missing or unreadable file starts the list
    /// empty rather than failing.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Vec<i64>>(&content) {
                Ok(ids) => {
                    info!(count = ids.len(), path = %path.display(), "Loaded faulty AC list");
                    ids.into_iter().collect()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Faulty AC list unparseable, starting empty");
                    HashSet::new()
                }
            },
            Err(_) => HashSet::new(),
        };

        Self {
            path,
            ids: RwLock::new(ids),
        }
    }

    pub async fn contains(&self, vehicle_id: i64) -> bool {
        self.ids.read().await.contains(&vehicle_id)
    }

    /// Snapshot of the current ids, for batch enrichment without repeated
    /// lock traffic.
    pub async fn snapshot(&self) -> HashSet<i64> {
        self.ids.read().await.clone()
    }

    pub async fn add(&self, vehicle_id: i64) -> Result<(), FleetError> {
        validate_id(vehicle_id)?;
        let mut ids = self.ids.write().await;
        if !ids.insert(vehicle_id) {
            return Err(FleetError::AlreadyListed(vehicle_id));
        }
        self.persist(&ids).await?;
        info!(vehicle_id, "Added vehicle to faulty AC list");
        Ok(())
    }

    pub async fn remove(&self, vehicle_id: i64) -> Result<(), FleetError> {
        validate_id(vehicle_id)?;
        let mut ids = self.ids.write().await;
        if !ids.remove(&vehicle_id) {
            return Err(FleetError::NotListed(vehicle_id));
        }
        self.persist(&ids).await?;
        info!(vehicle_id, "Removed vehicle from faulty AC list");
        Ok(())
    }

    async fn persist(&self, ids: &HashSet<i64>) -> Result<(), FleetError> {
        let mut sorted: Vec<i64> = ids.iter().copied().collect();
        sorted.sort_unstable();
        let content = serde_json::to_string_pretty(&sorted)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn validate_id(vehicle_id: i64) -> Result<(), FleetError> {
    if vehicle_id <= MIN_VEHICLE_ID || vehicle_id >= MAX_VEHICLE_ID {
        return Err(FleetError::OutOfRange(vehicle_id));
    }
    Ok(())
}
