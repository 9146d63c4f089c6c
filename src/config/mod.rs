// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{DEFAULT_OVERLAY_CACHE_ENTRIES, DEFAULT_PREVIEW_MAX_EDGE};
use crate::logging::LogFormat;
use crate::store::default_app_dir;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Environment variable '{0}' is referenced but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Application configuration for the CLI and app shell.
///
/// Every section is optional; a missing file means all defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub fonts: FontsConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where templates and the session file live
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Application directory (default: `$XDG_CONFIG_HOME/watermarker`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

fn default_preview_max_edge() -> u32 {
    DEFAULT_PREVIEW_MAX_EDGE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Longest edge of the preview image in pixels (default: 1024)
    #[serde(default = "default_preview_max_edge")]
    pub max_edge: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_edge: DEFAULT_PREVIEW_MAX_EDGE,
        }
    }
}

/// Extra font directories scanned at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontsConfig {
    #[serde(default)]
    pub directories: Vec<PathBuf>,
}

fn default_overlay_cache_entries() -> u64 {
    DEFAULT_OVERLAY_CACHE_ENTRIES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Decoded overlay images kept in memory (default: 16)
    #[serde(default = "default_overlay_cache_entries")]
    pub overlay_cache_entries: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            overlay_cache_entries: DEFAULT_OVERLAY_CACHE_ENTRIES,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Default level when `RUST_LOG` is not set (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut missing = None;
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });
        if let Some(var_name) = missing {
            return Err(ConfigError::MissingEnvVar(var_name));
        }

        // An empty document is a valid, all-default config
        if substituted.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview.max_edge == 0 {
            return Err(ConfigError::Invalid(
                "preview.max_edge must be greater than 0".to_string(),
            ));
        }

        if self.render.overlay_cache_entries == 0 {
            return Err(ConfigError::Invalid(
                "render.overlay_cache_entries must be greater than 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }

        if let Some(dir) = &self.storage.directory {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "storage.directory cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Configured application directory, else the platform default.
    pub fn app_dir(&self) -> Option<PathBuf> {
        self.storage.directory.clone().or_else(default_app_dir)
    }
}
