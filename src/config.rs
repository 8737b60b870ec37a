use crate::domains::overlay::{DEFAULT_POSITION_EPSILON_DEG, DEFAULT_ZOOM};
use crate::domains::tracking::{FramePolicy, GeoPoint, DEFAULT_ASSUMED_SPEED_KMH, DEFAULT_URGENCY_WINDOW_HOURS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `MISSION_TRACKER__POLLING__TRACKING_INTERVAL_MS=500`.
pub const ENV_PREFIX: &str = "MISSION_TRACKER";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub polling: PollingConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub assumed_speed_kmh: f64,
    pub urgency_window_hours: i64,
    pub position_epsilon_deg: f64,
    pub zoom: u8,
    /// Where the map starts before anything is known.
    pub default_center: GeoPoint,
    /// Pan the overview map to volunteers as they move.
    pub overview_follows_live: bool,
}

/// Tracking and chat poll at different rates; the chat rate is only carried for
/// collaborators sharing this config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub tracking_interval_ms: u64,
    pub chat_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// JSON file holding the mission records.
    pub missions_path: PathBuf,
    /// Serve an in-memory fleet that moves on its own instead of reading the file.
    pub simulate: bool,
    /// Track one mission instead of the whole fleet.
    pub focus_mission: Option<String>,
    pub viewer: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub geojson_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: Option<String>,
    pub level: String,
    pub console: bool,
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults, then the TOML file if it exists, then `MISSION_TRACKER__*` variables.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults = config::Config::try_from(&Config::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

impl TrackingConfig {
    pub fn frame_policy(&self) -> FramePolicy {
        FramePolicy::new(self.assumed_speed_kmh, self.urgency_window_hours)
    }
}

impl PollingConfig {
    pub fn tracking_interval(&self) -> Duration {
        Duration::from_millis(self.tracking_interval_ms.max(1))
    }

    pub fn chat_interval(&self) -> Duration {
        Duration::from_millis(self.chat_interval_ms.max(1))
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            assumed_speed_kmh: DEFAULT_ASSUMED_SPEED_KMH,
            urgency_window_hours: DEFAULT_URGENCY_WINDOW_HOURS,
            position_epsilon_deg: DEFAULT_POSITION_EPSILON_DEG,
            zoom: DEFAULT_ZOOM,
            default_center: GeoPoint {
                lat: 20.5937,
                lng: 78.9629,
            },
            overview_follows_live: true,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            tracking_interval_ms: 2000,
            chat_interval_ms: 1000,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            missions_path: PathBuf::from("missions.json"),
            simulate: false,
            focus_mission: None,
            viewer: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            geojson_path: Some(PathBuf::from("overlay.geojson")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
            console: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tracking_constants() {
        let config = Config::default();
        assert_eq!(config.polling.tracking_interval(), Duration::from_millis(2000));
        assert_eq!(config.polling.chat_interval(), Duration::from_millis(1000));
        assert_eq!(config.tracking.frame_policy(), FramePolicy::default());
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Info);
    }

    #[tokio::test]
    async fn from_file_fills_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[tracking]\nassumed_speed_kmh = 30.0\n\n[source]\nsimulate = true\n")
            .await
            .unwrap();

        let config = Config::from_file(&path).await.unwrap();
        assert_eq!(config.tracking.assumed_speed_kmh, 30.0);
        assert_eq!(config.tracking.zoom, DEFAULT_ZOOM);
        assert!(config.source.simulate);
        assert_eq!(config.polling.tracking_interval_ms, 2000);
    }

    #[test]
    fn load_layers_file_and_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[polling]\ntracking_interval_ms = 500\n").unwrap();
        std::env::set_var("MISSION_TRACKER__POLLING__CHAT_INTERVAL_MS", "250");

        let config = Config::load(&path).unwrap();
        std::env::remove_var("MISSION_TRACKER__POLLING__CHAT_INTERVAL_MS");

        assert_eq!(config.polling.tracking_interval_ms, 500);
        assert_eq!(config.polling.chat_interval_ms, 250);
        assert_eq!(config.tracking.default_center, TrackingConfig::default().default_center);
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.output.geojson_path, Some(PathBuf::from("overlay.geojson")));
        assert!(config.source.focus_mission.is_none());
    }
}
