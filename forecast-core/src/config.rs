use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::{city::City, training::TrainingParams};

pub const DEFAULT_DATA_LOCATION: &str = "weather_data.csv";
pub const DEFAULT_MODEL_PATH: &str = "weather_forecast_model.json";
pub const DEFAULT_FEATURES_PATH: &str = "model_features.json";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// data_location = "weather_data.csv"
/// default_city = "Berlin"
///
/// [training]
/// n_estimators = 300
/// learning_rate = 0.1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path or http(s) URL of the historical CSV.
    pub data_location: String,
    pub model_path: PathBuf,
    pub features_path: PathBuf,
    /// City shown when none is given on the command line.
    pub default_city: Option<String>,
    pub training: TrainingParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_location: DEFAULT_DATA_LOCATION.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            features_path: PathBuf::from(DEFAULT_FEATURES_PATH),
            default_city: None,
            training: TrainingParams::default(),
        }
    }
}

impl Config {
    /// Return the default city as a strongly-typed City, if one is configured.
    pub fn default_city(&self) -> Result<Option<City>> {
        self.default_city
            .as_deref()
            .map(|name| {
                City::try_from(name).context(
                    "Configured default city is invalid.\n\
                     Hint: run `forecast configure` to pick one of the supported cities.",
                )
            })
            .transpose()
    }

    /// Store default city by its canonical name.
    pub fn set_default_city(&mut self, city: City) {
        self.default_city = Some(city.as_str().to_string());
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(path = %path.display(), "saved configuration");
        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-forecast", "forecast-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
