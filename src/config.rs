//! CLI configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via --config or TICKFSM_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tickfsm_core::{BuilderConfig, NameStorage, PoolConfig};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub log: LogConfig,
    /// Machine builder settings.
    pub builder: BuilderConfig,
    /// Pool settings.
    pub pool: PoolConfig,
    /// Simulation limits.
    pub simulate: SimulateConfig,
}

impl Config {
    /// Loads configuration from `path` (or TICKFSM_CONFIG), then applies
    /// environment variable overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("TICKFSM_CONFIG").ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    /// Unparseable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("TICKFSM_LOG_LEVEL") {
            self.log.level = level;
        }

        if let Some(capacity) = lookup("TICKFSM_TABLE_CAPACITY") {
            if let Ok(n) = capacity.parse() {
                self.builder.table_capacity = n;
            }
        }

        if let Some(storage) = lookup("TICKFSM_NAME_STORAGE") {
            match storage.to_lowercase().as_str() {
                "shared" => self.builder.name_storage = NameStorage::Shared,
                "owned" => self.builder.name_storage = NameStorage::Owned,
                _ => {}
            }
        }

        if let Some(capacity) = lookup("TICKFSM_POOL_CAPACITY") {
            if let Ok(n) = capacity.parse() {
                self.pool.initial_capacity = n;
            }
        }

        if let Some(max) = lookup("TICKFSM_MAX_TICKS") {
            if let Ok(n) = max.parse() {
                self.simulate.max_ticks = n;
            }
        }
    }

    /// Validates configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.builder.table_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "builder.table_capacity must be at least 1".to_string(),
            ));
        }
        if self.pool.initial_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "pool.initial_capacity must be at least 1".to_string(),
            ));
        }
        if self.simulate.max_ticks == 0 {
            return Err(ConfigError::ValidationError(
                "simulate.max_ticks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when RUST_LOG is not set.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Simulation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulateConfig {
    /// Maximum ticks one script or REPL session may run.
    pub max_ticks: u64,
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self { max_ticks: 10_000 }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
