//! Editor configuration
//!
//! Read from `<config_dir>/channel-factory/config.toml`, or from the file named by
//! `CHANNEL_FACTORY_CONFIG`. Every field has a default, so an empty or missing file
//! yields the stock editor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::Model;

pub const CONFIG_ENV: &str = "CHANNEL_FACTORY_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Start zoomed out slightly so the whole factory fits
    pub initial_scale: f32,
    pub initial_pan: [f32; 2],
    /// Scale change per unit of wheel delta
    pub wheel_sensitivity: f32,
}

impl ViewportConfig {
    /// Scales must be finite, positive and ordered
    pub fn validate(&self) -> Result<(), String> {
        let scales = [
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
            ("initial_scale", self.initial_scale),
        ];
        for (name, value) in scales {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("viewport.{name} must be a positive number, got {value}"));
            }
        }
        if self.min_scale > self.max_scale {
            return Err(format!(
                "viewport.min_scale ({}) is larger than viewport.max_scale ({})",
                self.min_scale, self.max_scale
            ));
        }
        if !self.wheel_sensitivity.is_finite() || !self.initial_pan.iter().all(|v| v.is_finite()) {
            return Err("viewport.wheel_sensitivity and viewport.initial_pan must be finite".to_string());
        }
        Ok(())
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.4,
            max_scale: 2.0,
            initial_scale: 0.8,
            initial_pan: [50.0, 50.0],
            wheel_sensitivity: 0.001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Pause between nodes during a whole-graph run
    pub step_delay_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { step_delay_ms: 500 }
    }
}

impl RunConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub viewport: ViewportConfig,
    pub run: RunConfig,
    pub default_model: Model,
    /// Where snapshots are written natively; defaults to the platform data dir
    pub storage_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            run: RunConfig::default(),
            default_model: Model::Gemini,
            storage_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl FactoryConfig {
    pub fn from_toml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.viewport.validate().map_err(|reason| ConfigError::Invalid {
            path: origin.to_string(),
            reason,
        })?;
        Ok(config)
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text, &path.display().to_string())
    }

    /// Load from `CHANNEL_FACTORY_CONFIG` or the platform config directory
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self::default())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("channel-factory").join("config.toml"))
    }

    /// Directory for native snapshot files
    #[cfg(not(target_arch = "wasm32"))]
    pub fn resolved_storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("channel-factory")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config = FactoryConfig::from_toml(
            r#"
            default_model = "claude"

            [viewport]
            max_scale = 3.0

            [run]
            step_delay_ms = 0
            "#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.default_model, Model::Claude);
        assert_eq!(config.viewport.max_scale, 3.0);
        assert_eq!(config.viewport.min_scale, 0.4);
        assert_eq!(config.run.step_delay(), Duration::ZERO);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = FactoryConfig::from_toml("viewport = 3", "bad.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn inverted_scale_bounds_are_rejected() {
        let err = FactoryConfig::from_toml("[viewport]\nmin_scale = 3.0\n", "user.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("min_scale"));

        let err = FactoryConfig::from_toml("[viewport]\nmax_scale = nan\n", "user.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(FactoryConfig::from_toml("[viewport]\ninitial_scale = 0.0\n", "user.toml").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FactoryConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, FactoryConfig::default());
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"debug\"\n").unwrap();
        let config = FactoryConfig::load_from(&path).unwrap();
        assert_eq!(config.log_level, "debug");
    }
}
