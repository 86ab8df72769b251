//! Configuration loader supporting YAML, TOML, and JSON formats.

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml)
    #[default]
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "yaml" | "yml" => Some(Self::Yaml),
                "toml" => Some(Self::Toml),
                "json" => Some(Self::Json),
                _ => None,
            })
    }

    /// Returns the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Configuration loader with format auto-detection.
///
/// # Example
///
/// ```rust,ignore
/// use ballast_core::config::{BallastConfig, ConfigLoader};
///
/// let config: BallastConfig = ConfigLoader::new().load_file("ballast.yaml")?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Creates a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Loads configuration from a file, detecting the format from the
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the format is not
    /// recognized, or the content cannot be parsed.
    pub fn load_file<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::InvalidFormat {
            path: path.display().to_string(),
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.load_str(&content, format)
    }

    /// Parses configuration from a string in the given format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the content cannot be parsed.
    pub fn load_str<T>(&self, content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                format: "yaml".to_string(),
                reason: e.to_string(),
            }),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse {
                format: "toml".to_string(),
                reason: e.to_string(),
            }),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                format: "json".to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
