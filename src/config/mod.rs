//! Configuration module for tagview
//!
//! Manages the backend location and engine tuning. Configuration is stored
//! in the user's config directory as TOML and may be overridden per run with
//! `TAGVIEW_*` environment variables (e.g. `TAGVIEW_BACKEND_URL`).

pub mod setup;

pub use setup::{first_time_setup, recover_backend};

use crate::gallery::{EngineSettings, cache, display, search, window};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const fn default_cache_capacity() -> usize {
    cache::DEFAULT_CAPACITY
}

const fn default_tag_radius() -> usize {
    search::DEFAULT_TAG_RADIUS
}

const fn default_prompt_limit() -> usize {
    search::DEFAULT_PROMPT_LIMIT
}

#[allow(clippy::cast_possible_truncation)]
const fn default_refetch_debounce_ms() -> u64 {
    window::DEFAULT_REFETCH_DEBOUNCE.as_millis() as u64
}

const fn default_max_name_length() -> usize {
    display::DEFAULT_MAX_NAME_LENGTH
}

/// Application configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TagviewConfig {
    /// Base URL of the media backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    /// Number of media payloads kept in memory
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Items fetched on each side of the focal item
    #[serde(default = "default_tag_radius")]
    pub tag_radius: usize,

    /// Number of results requested by a prompt search
    #[serde(default = "default_prompt_limit")]
    pub prompt_limit: usize,

    /// Minimum spacing of scroll-triggered refetches
    #[serde(default = "default_refetch_debounce_ms")]
    pub refetch_debounce_ms: u64,

    /// Displayed names longer than this are shortened
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,

    /// Suppress informational output by default
    #[serde(default)]
    pub quiet: bool,
}

impl Default for TagviewConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            cache_capacity: default_cache_capacity(),
            tag_radius: default_tag_radius(),
            prompt_limit: default_prompt_limit(),
            refetch_debounce_ms: default_refetch_debounce_ms(),
            max_name_length: default_max_name_length(),
            quiet: false,
        }
    }
}

/// Checks that `url` is an absolute http(s) URL and returns it trimmed
///
/// # Errors
///
/// Returns `ConfigError::Message` describing why the URL was rejected.
pub fn validate_backend_url(url: &str) -> Result<String, ConfigError> {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(ConfigError::Message("Backend URL is empty".to_string()));
    }
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ConfigError::Message(format!("Invalid backend URL '{url}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Message(format!(
            "Backend URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }
    Ok(url.to_string())
}

impl TagviewConfig {
    /// Get the path to the config file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the system config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::Message("Could not determine config directory".to_string())
        })?;

        Ok(config_dir.join("tagview").join("config.toml"))
    }

    /// Load configuration from the default location
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file cannot be read, parsed, or created.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults if it doesn't exist
    ///
    /// Environment overrides are applied on top of the file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or created.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let default_config = Self::default();
            default_config.save_to(path)?;
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(Environment::with_prefix("TAGVIEW").try_parsing(true))
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to the default location
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config directory cannot be created, the
    /// configuration cannot be serialized to TOML, or the file cannot be written.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    ///
    /// # Errors
    ///
    /// As [`TagviewConfig::save`].
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::Message(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Load configuration, running first-time setup if there is no backend yet
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if loading or creating the configuration fails.
    pub fn load_or_setup() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        if config.backend_url.is_some() {
            Ok(config)
        } else {
            first_time_setup(config)
        }
    }

    /// Validate and store a new backend URL
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is invalid.
    pub fn set_backend_url(&mut self, url: &str) -> Result<(), ConfigError> {
        self.backend_url = Some(validate_backend_url(url)?);
        Ok(())
    }

    /// The engine-facing subset of the configuration
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            cache_capacity: self.cache_capacity,
            tag_radius: self.tag_radius,
            prompt_limit: self.prompt_limit,
            refetch_debounce: Duration::from_millis(self.refetch_debounce_ms),
            max_name_length: self.max_name_length,
        }
        .validated()
    }
}
