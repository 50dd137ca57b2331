//! Configuration management for Inspectra
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files and environment variables.

use crate::error::{InspectraError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable holding the gateway API key
pub const ENV_API_KEY: &str = "INSPECTRA_API_KEY";
/// Environment variable overriding the gateway endpoint URL
pub const ENV_API_URL: &str = "INSPECTRA_API_URL";
/// Environment variable overriding the model identifier
pub const ENV_MODEL: &str = "INSPECTRA_MODEL";

/// Main configuration structure for Inspectra
///
/// This structure holds all configuration needed for the application,
/// including gateway settings and local storage paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// AI gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Local storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// AI gateway configuration
///
/// Specifies the endpoint, model, and request shaping for the
/// multimodal chat call. The API key is never written to a config
/// file; it is read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bearer token for the gateway; sourced from INSPECTRA_API_KEY
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Endpoint URL for the multimodal chat API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Response length cap
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_endpoint() -> String {
    "https://platform.qubrid.com/api/v1/qubridai/multimodal/chat".to_string()
}

fn default_model() -> String {
    "Qwen/Qwen3-VL-30B-A3B-Instruct".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.6
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Local storage configuration
///
/// Optional overrides for the database file and the uploaded-image
/// asset directory. When unset, both default to the platform data
/// directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(default)]
    pub db_path: Option<String>,

    /// Directory where uploaded image assets are stored
    #[serde(default)]
    pub assets_dir: Option<String>,
}

impl Config {
    /// Load configuration from a file with environment overrides
    ///
    /// A missing config file is not an error; defaults are used. After the
    /// file (or defaults) are loaded, `INSPECTRA_API_KEY`,
    /// `INSPECTRA_API_URL`, and `INSPECTRA_MODEL` are applied on top.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a YAML configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config: Config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                InspectraError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_yaml::from_str(&contents).map_err(|e| {
                InspectraError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides onto the loaded config
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            if !key.is_empty() {
                self.gateway.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.is_empty() {
                self.gateway.endpoint = url;
            }
        }
        if let Ok(model) = std::env::var(ENV_MODEL) {
            if !model.is_empty() {
                self.gateway.model = model;
            }
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint or model is empty, or if the
    /// temperature is outside [0, 2]
    pub fn validate(&self) -> Result<()> {
        if self.gateway.endpoint.is_empty() {
            return Err(InspectraError::Config("Gateway endpoint is empty".to_string()).into());
        }
        if self.gateway.model.is_empty() {
            return Err(InspectraError::Config("Model identifier is empty".to_string()).into());
        }
        if !(0.0..=2.0).contains(&self.gateway.temperature) {
            return Err(InspectraError::Config(format!(
                "Temperature {} outside valid range [0, 2]",
                self.gateway.temperature
            ))
            .into());
        }
        Ok(())
    }
}
