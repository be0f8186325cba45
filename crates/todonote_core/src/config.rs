//! Runtime configuration for hosts embedding the core.
//!
//! # Responsibility
//! - Describe which store backend to use and where logs go.
//! - Load settings from process environment (and `.env` when present).
//!
//! # Invariants
//! - The `sqlite` backend always carries a non-empty database path.
//! - Unset variables fall back to defaults; malformed ones are errors.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const ENV_BACKEND: &str = "TODONOTE_BACKEND";
pub const ENV_DB_PATH: &str = "TODONOTE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TODONOTE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TODONOTE_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported backend `{0}`; expected memory|sqlite")]
    UnknownBackend(String),
    #[error("TODONOTE_DB_PATH is required when TODONOTE_BACKEND=sqlite")]
    MissingDbPath,
}

/// Record store implementation selected at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Sqlite,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "inmemory" => Ok(Self::Memory),
            "sqlite" | "sql" => Ok(Self::Sqlite),
            _ => Err(ConfigError::UnknownBackend(value.to_string())),
        }
    }
}

/// Core settings resolved at process start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub backend: Backend,
    /// Database file for the `sqlite` backend.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory. `None` leaves file logging off.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Loads settings from the environment after reading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(raw) = read(ENV_BACKEND) {
            config.backend = raw.parse()?;
        }
        config.db_path = read(ENV_DB_PATH).map(PathBuf::from);
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == Backend::Sqlite && self.db_path.is_none() {
            return Err(ConfigError::MissingDbPath);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Backend, ConfigError, CoreConfig, ENV_BACKEND, ENV_DB_PATH, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.backend, Backend::Memory);
    }

    #[test]
    fn sqlite_backend_reads_path_and_level() {
        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_BACKEND, " SQLite "),
            (ENV_DB_PATH, "/tmp/notes.db"),
            (ENV_LOG_LEVEL, "warn"),
        ]))
        .unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/notes.db")));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            CoreConfig::from_lookup(lookup(&[(ENV_BACKEND, "postgres")])),
            Err(ConfigError::UnknownBackend("postgres".to_string()))
        );
        assert_eq!(
            CoreConfig::from_lookup(lookup(&[(ENV_BACKEND, "sqlite")])),
            Err(ConfigError::MissingDbPath)
        );
    }

    #[test]
    fn backend_serializes_lowercase() {
        let json = serde_json::to_string(&Backend::Sqlite).unwrap();
        assert_eq!(json, "\"sqlite\"");
    }
}
