use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    model::{Coordinates, Location},
    widget::StalePolicy,
};

pub const DEFAULT_GEOCODING_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_FORECAST_URL: &str = "https://api.met.no/weatherapi/locationforecast/2.0";
pub const DEFAULT_USER_AGENT: &str = concat!("citycast/", env!("CARGO_PKG_VERSION"));

/// Startup location as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// user_agent = "citycast/0.1 you@example.com"
/// stale_responses = "ignore"
///
/// [default_location]
/// name = "Bergen"
/// latitude = 60.39
/// longitude = 5.32
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Identification sent to both upstream APIs. Both usage policies ask for
    /// an application name plus a contact.
    pub user_agent: Option<String>,

    pub default_location: Option<LocationConfig>,

    /// Base URL of the Nominatim instance (without `/search`).
    pub geocoding_url: Option<String>,

    /// Base URL of Locationforecast 2.0 (without `/compact`).
    pub forecast_url: Option<String>,

    pub stale_responses: Option<StalePolicy>,

    /// HTTP timeout. Requests never time out when unset.
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn geocoding_url(&self) -> &str {
        self.geocoding_url.as_deref().unwrap_or(DEFAULT_GEOCODING_URL)
    }

    pub fn forecast_url(&self) -> &str {
        self.forecast_url.as_deref().unwrap_or(DEFAULT_FORECAST_URL)
    }

    pub fn stale_policy(&self) -> StalePolicy {
        self.stale_responses.unwrap_or_default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Location shown before the first search; Oslo unless configured.
    pub fn default_location(&self) -> Location {
        match &self.default_location {
            Some(loc) => Location {
                label: loc.name.clone(),
                coordinates: Coordinates::new(loc.latitude, loc.longitude),
            },
            None => Location::oslo(),
        }
    }

    pub fn set_default_location(&mut self, location: &Location) {
        self.default_location = Some(LocationConfig {
            name: location.label.clone(),
            latitude: location.coordinates.latitude,
            longitude: location.coordinates.longitude,
        });
    }

    pub fn set_user_agent(&mut self, user_agent: String) {
        let trimmed = user_agent.trim();
        self.user_agent = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Where the interactive widget writes its log, since it owns the terminal.
    pub fn log_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.data_local_dir().join("citycast.log"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "citycast", "citycast")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
