//! TOML-based configuration for cellsync.
//!
//! Supports a config file (cellsync.toml) with environment variable expansion
//! in service URLs.
//!
//! Example configuration:
//! ```toml
//! [flux]
//! ast_url = "${CHRONOGRAF_URL}/chronograf/v1/flux/ast"
//! suggestions_url = "${CHRONOGRAF_URL}/chronograf/v1/flux/suggestions"
//! debounce_ms = 250
//!
//! [execution]
//! max_response_bytes = 10000000
//! timeout_secs = 30
//!
//! [explorer]
//! config_url = "${CHRONOGRAF_URL}/chronograf/v1/sources/1/queries"
//! pixels = 333
//! default_duration_ms = 1000
//!
//! [logging]
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::observability::LogFormat;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Parser and suggestion services.
    pub flux: FluxSettings,

    /// Script execution.
    pub execution: ExecutionSettings,

    /// Raw-text resolution for explorer queries.
    pub explorer: ExplorerSettings,

    /// Log output.
    pub logging: LoggingSettings,
}

/// Parser service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FluxSettings {
    /// Parse endpoint (supports ${ENV_VAR} expansion).
    pub ast_url: String,

    /// Suggestion catalog endpoint (supports ${ENV_VAR} expansion).
    pub suggestions_url: String,

    /// Quiet period before a text edit is parsed.
    pub debounce_ms: u64,
}

impl Default for FluxSettings {
    fn default() -> Self {
        Self {
            ast_url: "http://localhost:8888/chronograf/v1/flux/ast".to_string(),
            suggestions_url: "http://localhost:8888/chronograf/v1/flux/suggestions".to_string(),
            debounce_ms: 250,
        }
    }
}

impl FluxSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Responses beyond this size are truncated.
    pub max_response_bytes: usize,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_response_bytes: 10_000_000,
            timeout_secs: 30,
        }
    }
}

impl ExecutionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Explorer query resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExplorerSettings {
    /// Resolution endpoint (supports ${ENV_VAR} expansion).
    pub config_url: String,

    /// Width used to turn a duration into a group-by interval.
    pub pixels: u64,

    /// Duration assumed when the resolver gives no estimate.
    pub default_duration_ms: u64,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            config_url: "http://localhost:8888/chronograf/v1/sources/1/queries".to_string(),
            pixels: 333,
            default_duration_ms: 1000,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `CELLSYNC_CONFIG`
    /// 2. `./cellsync.toml`
    /// 3. `~/.config/cellsync/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("CELLSYNC_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("cellsync.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cellsync").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject values the engines cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.explorer.pixels == 0 {
            return Err(SettingsError::InvalidConfig(
                "explorer.pixels must be positive".to_string(),
            ));
        }
        if self.execution.max_response_bytes == 0 {
            return Err(SettingsError::InvalidConfig(
                "execution.max_response_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse endpoint with environment variables expanded.
    pub fn ast_url(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.flux.ast_url)
    }

    /// Suggestion endpoint with environment variables expanded.
    pub fn suggestions_url(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.flux.suggestions_url)
    }

    /// Resolution endpoint with environment variables expanded.
    pub fn config_url(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.explorer.config_url)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            chars.by_ref().take_while(|ch| *ch != '}').collect()
        } else {
            // $VAR ends at the first non-alphanumeric/underscore
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
