//! Static GTFS data access: shape polylines, stop locations, and the line
//! catalog.
//!
//! Loads `shapes.txt`, `stops.txt`, and `routes.txt` into memory, builds
//! [`ShapePolyline`] instances (with cumulative along-shape distances) lazily
//! per shape key, and caches them for the process lifetime. Reloading and
//! invalidation are driven by the caller (e.g. a nightly GTFS refresh); the
//! provider schedules nothing itself.

pub mod error;
pub mod shapes;
pub mod static_data;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::config::GtfsConfig;

use error::GtfsError;
use shapes::ShapePolyline;
use static_data::{GtfsStatic, LineInfo};

pub struct GtfsProvider {
    config: GtfsConfig,
    data: RwLock<Option<GtfsStatic>>,
    shapes: RwLock<HashMap<String, Arc<ShapePolyline>>>,
}

impl GtfsProvider {
    pub fn new(config: GtfsConfig) -> Self {
        Self {
            config,
            data: RwLock::new(None),
            shapes: RwLock::new(HashMap::new()),
        }
    }

    /// (Re)load the static GTFS files into memory and drop all cached
    /// polylines.
    pub async fn reload(&self) -> Result<(), GtfsError> {
        let config = self.config.clone();
        let data = tokio::task::spawn_blocking(move || {
            static_data::load_static(
                &config.shapes_path,
                &config.stops_path,
                &config.routes_path,
            )
        })
        .await??;

        info!(
            shapes = data.shapes.len(),
            stops = data.stops.len(),
            lines = data.lines.len(),
            "Loaded static GTFS data into memory"
        );

        let mut guard = self.data.write().await;
        *guard = Some(data);
        self.shapes.write().await.clear();

        Ok(())
    }

    pub async fn is_loaded(&self) -> bool {
        self.data.read().await.is_some()
    }

    /// Get the polyline for a shape key, building and caching it on first
    /// access. Repeat calls return the identical cached instance.
    ///
    /// Concurrent first accesses may build the polyline more than once but
    /// converge on a single cached instance (the build is idempotent).
    pub async fn shape(&self, shape_key: &str) -> Result<Arc<ShapePolyline>, GtfsError> {
        if let Some(hit) = self.shapes.read().await.get(shape_key) {
            return Ok(hit.clone());
        }

        let built = {
            let guard = self.data.read().await;
            let data = guard.as_ref().ok_or(GtfsError::NotLoaded)?;
            let points = data
                .shapes
                .get(shape_key)
                .ok_or_else(|| GtfsError::ShapeNotFound(shape_key.to_string()))?;
            ShapePolyline::build(shape_key.to_string(), points.clone())
                .ok_or_else(|| GtfsError::ShapeNotFound(shape_key.to_string()))?
        };

        let mut cache = self.shapes.write().await;
        let entry = cache
            .entry(shape_key.to_string())
            .or_insert_with(|| Arc::new(built));
        Ok(entry.clone())
    }

    /// Drop cached polylines: a specific key, or everything when `None`.
    /// The underlying raw data is unaffected; use [`reload`](Self::reload)
    /// to pick up new GTFS files.
    pub async fn invalidate(&self, shape_key: Option<&str>) {
        let mut cache = self.shapes.write().await;
        match shape_key {
            Some(key) => {
                cache.remove(key);
            }
            None => cache.clear(),
        }
    }

    pub async fn stop_location(&self, stop_id: &str) -> Result<crate::geo::GeoPoint, GtfsError> {
        let guard = self.data.read().await;
        let data = guard.as_ref().ok_or(GtfsError::NotLoaded)?;
        data.stops
            .get(stop_id)
            .copied()
            .ok_or_else(|| GtfsError::StopNotFound(stop_id.to_string()))
    }

    /// Look up a line by its rider-facing short name.
    pub async fn line(&self, short_name: &str) -> Result<Option<LineInfo>, GtfsError> {
        let guard = self.data.read().await;
        let data = guard.as_ref().ok_or(GtfsError::NotLoaded)?;
        Ok(data.lines.get(short_name).cloned())
    }

    /// The full line catalog, cloned for the caller.
    pub async fn lines(&self) -> Result<HashMap<String, LineInfo>, GtfsError> {
        let guard = self.data.read().await;
        let data = guard.as_ref().ok_or(GtfsError::NotLoaded)?;
        Ok(data.lines.clone())
    }

    #[cfg(test)]
    pub(crate) async fn with_data(config: GtfsConfig, data: GtfsStatic) -> Self {
        let provider = Self::new(config);
        *provider.data.write().await = Some(data);
        provider
    }
}
