//! Configuration module for cellsync.
//!
//! Handles service endpoints, engine tuning, environment variables and
//! logging settings.

mod settings;

pub use settings::{
    expand_env_vars, ExecutionSettings, ExplorerSettings, FluxSettings, LoggingSettings,
    Settings, SettingsError,
};
