// SPDX-License-Identifier: MIT OR Apache-2.0
//! Application configuration.
//!
//! Stored as RON in `flyover.ron` next to where the tool is run. A missing
//! file means defaults; command line flags override individual values.

use clap::ValueEnum;
use flyover_export::{ExportMode, ExportSettings, DEFAULT_POLL_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Current config format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "flyover.ron";

/// Errors while loading or saving the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON for this config
    #[error("malformed config file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The config could not be written as RON
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer version of the tool
    #[error("config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },
}

/// Export pipeline selection, shared by the config file and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModeChoice {
    /// Render frames locally and upload them
    #[default]
    Client,
    /// Let the server render the whole path
    Server,
}

impl From<ModeChoice> for ExportMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Client => ExportMode::ClientCapture,
            ModeChoice::Server => ExportMode::ServerRender,
        }
    }
}

/// Where the render/encode server lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Server root, e.g. `http://localhost:3000`
    pub base_url: String,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_owned(),
            user_agent: format!("flyover/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Export values used when the command line does not set them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Encoder quality, 1-100
    pub quality: u8,
    /// Pipeline
    pub mode: ModeChoice,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        let settings = ExportSettings::default();
        Self {
            width: settings.width,
            height: settings.height,
            quality: settings.quality,
            mode: ModeChoice::default(),
        }
    }
}

/// Top-level config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Format version
    pub version: u32,
    /// Render/encode server
    pub backend: BackendSettings,
    /// Export defaults
    pub export: ExportDefaults,
    /// Server-render status poll cadence in milliseconds
    pub poll_interval_ms: u64,
    /// Directory exported videos are written to
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            backend: BackendSettings::default(),
            export: ExportDefaults::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Load the config from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Load the config, falling back to defaults when the file is missing
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = Self::load(path)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse RON text, rejecting files from newer versions
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = ron::from_str(content)?;
        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }
        Ok(config)
    }

    /// Render as pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Save the config to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Server-render poll cadence
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Default export settings
    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            width: self.export.width,
            height: self.export.height,
            quality: self.export.quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version, CONFIG_FORMAT_VERSION);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.export_settings(), ExportSettings::default());
        assert_eq!(config.export.mode, ModeChoice::Client);
    }

    #[test]
    fn test_serialization() {
        let mut config = AppConfig::default();
        config.backend.base_url = "http://render.example:8080".to_owned();
        config.export.mode = ModeChoice::Server;
        config.export.quality = 75;

        let ron_str = config.to_ron().unwrap();
        let loaded = AppConfig::from_ron(&ron_str).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded = AppConfig::from_ron("(poll_interval_ms: 250)").unwrap();
        assert_eq!(loaded.poll_interval(), Duration::from_millis(250));
        assert_eq!(loaded.backend, BackendSettings::default());
    }

    #[test]
    fn test_newer_version_rejected() {
        let result = AppConfig::from_ron("(version: 99)");
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedVersion { found: 99, .. })
        ));
        assert!(matches!(AppConfig::from_ron("(version: "), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_mode_choice_maps_to_pipeline() {
        assert_eq!(ExportMode::from(ModeChoice::Client), ExportMode::ClientCapture);
        assert_eq!(ExportMode::from(ModeChoice::Server), ExportMode::ServerRender);
    }
}
