use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Engine configuration, loaded from a YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gtfs: GtfsConfig,
    pub fleet: FleetConfig,
    pub feed: FeedConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub freshness: FreshnessConfig,
    #[serde(default)]
    pub eta: EtaConfig,
}

/// Locations of the static GTFS files.
#[derive(Debug, Clone, Deserialize)]
pub struct GtfsConfig {
    pub shapes_path: PathBuf,
    pub stops_path: PathBuf,
    pub routes_path: PathBuf,
}

/// Locations of the fleet data files.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    /// CSV roster mapping park numbers to vehicle types.
    pub roster_path: PathBuf,
    /// YAML class table: id ranges, type images, no-AC types.
    pub classes_path: PathBuf,
    /// JSON list of vehicle ids with broken air conditioning.
    pub faulty_ac_path: PathBuf,
}

/// Endpoints of the realtime collaborators.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Vehicle position feed (GTFS-RT-style JSON entities).
    pub positions_url: String,
    /// Passenger telemetry dataset.
    pub dataset_url: String,
    /// Arrival-times endpoint; stop and line ids are appended as path
    /// segments.
    pub arrivals_url: String,
    #[serde(default = "FeedConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl FeedConfig {
    fn default_request_timeout_secs() -> u64 {
        30
    }
}

/// Geometry gates for shape matching.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Proximity gate for ranking: a vehicle farther than this from every
    /// segment is off-route (default: 500 m).
    #[serde(default = "MatchingConfig::default_vehicle_gate_m")]
    pub vehicle_gate_m: f64,
    /// Strict gate for the route overview, where a vehicle must be
    /// logically snapped to the shape rather than merely nearby
    /// (default: 10 m).
    #[serde(default = "MatchingConfig::default_snap_gate_m")]
    pub snap_gate_m: f64,
    /// Optional gate for stop matching. Stops are on-route by construction,
    /// so the default is unbounded; a finite value turns a misassigned stop
    /// into a hard error instead of nonsense distances.
    #[serde(default)]
    pub stop_gate_m: Option<f64>,
}

impl MatchingConfig {
    fn default_vehicle_gate_m() -> f64 {
        500.0
    }
    fn default_snap_gate_m() -> f64 {
        10.0
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            vehicle_gate_m: Self::default_vehicle_gate_m(),
            snap_gate_m: Self::default_snap_gate_m(),
            stop_gate_m: None,
        }
    }
}

/// Policy for the bounded fix-freshness loop.
#[derive(Debug, Clone, Deserialize)]
pub struct FreshnessConfig {
    /// A fix older than this is stale (default: 60 s).
    #[serde(default = "FreshnessConfig::default_fix_cooldown_secs")]
    pub fix_cooldown_secs: i64,
    /// Wait between re-polls of a stale batch (default: 5 s).
    #[serde(default = "FreshnessConfig::default_poll_delay_secs")]
    pub poll_delay_secs: u64,
    /// Total poll attempts before giving up (default: 5).
    #[serde(default = "FreshnessConfig::default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    /// When true, an exhausted poll budget is an error; when false (the
    /// default) the last stale batch is served with a warning.
    #[serde(default)]
    pub fail_on_stale: bool,
}

impl FreshnessConfig {
    fn default_fix_cooldown_secs() -> i64 {
        60
    }
    fn default_poll_delay_secs() -> u64 {
        5
    }
    fn default_max_poll_attempts() -> u32 {
        5
    }
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            fix_cooldown_secs: Self::default_fix_cooldown_secs(),
            poll_delay_secs: Self::default_poll_delay_secs(),
            max_poll_attempts: Self::default_max_poll_attempts(),
            fail_on_stale: false,
        }
    }
}

/// Policy for arrival-time estimates.
#[derive(Debug, Clone, Deserialize)]
pub struct EtaConfig {
    /// Retry budget for the flaky times endpoint (default: 5).
    #[serde(default = "EtaConfig::default_max_attempts")]
    pub max_attempts: u32,
    /// Wait between retries (default: 3 s).
    #[serde(default = "EtaConfig::default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// How many leading vehicles get an ETA attached (default: 3).
    #[serde(default = "EtaConfig::default_eta_positions")]
    pub eta_positions: usize,
    /// Display text for the feed's beyond-forecast-window marker.
    #[serde(default = "EtaConfig::default_beyond_window_text")]
    pub beyond_window_text: String,
}

impl EtaConfig {
    fn default_max_attempts() -> u32 {
        5
    }
    fn default_retry_delay_secs() -> u64 {
        3
    }
    fn default_eta_positions() -> usize {
        3
    }
    fn default_beyond_window_text() -> String {
        "17+ min".to_string()
    }
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            retry_delay_secs: Self::default_retry_delay_secs(),
            eta_positions: Self::default_eta_positions(),
            beyond_window_text: Self::default_beyond_window_text(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Sanity-check the gate values; zero or negative gates would silently
    /// exclude every vehicle.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matching.vehicle_gate_m <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "matching.vehicle_gate_m must be positive".into(),
            ));
        }
        if self.matching.snap_gate_m <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "matching.snap_gate_m must be positive".into(),
            ));
        }
        if let Some(gate) = self.matching.stop_gate_m {
            if gate <= 0.0 {
                return Err(ConfigError::InvalidValue(
                    "matching.stop_gate_m must be positive when set".into(),
                ));
            }
        }
        if self.freshness.max_poll_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "freshness.max_poll_attempts must be at least 1".into(),
            ));
        }
        if self.eta.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "eta.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
gtfs:
  shapes_path: data/shapes.txt
  stops_path: data/stops.txt
  routes_path: data/routes.txt
fleet:
  roster_path: data/roster.csv
  classes_path: data/fleet_classes.yaml
  faulty_ac_path: data/faulty_ac.json
feed:
  positions_url: https://feed.example/positions
  dataset_url: https://feed.example/dataset
  arrivals_url: https://feed.example/times
"#
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.matching.vehicle_gate_m, 500.0);
        assert_eq!(config.matching.snap_gate_m, 10.0);
        assert_eq!(config.matching.stop_gate_m, None);
        assert_eq!(config.freshness.max_poll_attempts, 5);
        assert!(!config.freshness.fail_on_stale);
        assert_eq!(config.eta.eta_positions, 3);
        assert_eq!(config.feed.request_timeout_secs, 30);
        config.validate().unwrap();
    }

    #[test]
    fn overrides_are_honored() {
        let yaml = format!(
            "{}\nmatching:\n  vehicle_gate_m: 250\n  stop_gate_m: 1000\nfreshness:\n  fail_on_stale: true\n",
            minimal_yaml()
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.matching.vehicle_gate_m, 250.0);
        assert_eq!(config.matching.stop_gate_m, Some(1000.0));
        assert!(config.freshness.fail_on_stale);
    }

    #[test]
    fn validate_rejects_non_positive_gates() {
        let yaml = format!("{}\nmatching:\n  vehicle_gate_m: 0\n", minimal_yaml());
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_poll_attempts() {
        let yaml = format!("{}\nfreshness:\n  max_poll_attempts: 0\n", minimal_yaml());
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }
}
