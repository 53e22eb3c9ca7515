//! Engine configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                   | Default       |
//! |----------------------------|---------------|
//! | `NOMINA_DATABASE_PATH`     | `./nomina.db` |
//! | `NOMINA_MAX_CONNECTIONS`   | `5`           |
//! | `NOMINA_DEFAULT_PAGE_SIZE` | `20`          |
//! | `NOMINA_MAX_PAGE_SIZE`     | `100`         |

use nomina_db::DbConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: String,

    /// Upper bound of the connection pool
    pub max_connections: u32,

    /// Page size used when a search request names none
    pub default_page_size: u32,

    /// Largest page size a search may ask for; larger requests are clamped
    pub max_page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: "./nomina.db".to_string(),
            max_connections: 5,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            database_path: lookup("NOMINA_DATABASE_PATH")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.database_path),
            max_connections: parse_or(&lookup, "NOMINA_MAX_CONNECTIONS", defaults.max_connections)?,
            default_page_size: parse_or(&lookup, "NOMINA_DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: parse_or(&lookup, "NOMINA_MAX_PAGE_SIZE", defaults.max_page_size)?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("NOMINA_MAX_CONNECTIONS".to_string()));
        }
        if config.default_page_size == 0 {
            return Err(ConfigError::InvalidValue("NOMINA_DEFAULT_PAGE_SIZE".to_string()));
        }
        if config.default_page_size > config.max_page_size {
            return Err(ConfigError::Inconsistent(format!(
                "NOMINA_DEFAULT_PAGE_SIZE ({}) exceeds NOMINA_MAX_PAGE_SIZE ({})",
                config.default_page_size, config.max_page_size
            )));
        }

        Ok(config)
    }

    /// Pool settings for [`nomina_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.db_config().max_connections, 5);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("NOMINA_DATABASE_PATH", "/var/lib/nomina/payroll.db"),
            ("NOMINA_MAX_CONNECTIONS", "8"),
            ("NOMINA_DEFAULT_PAGE_SIZE", " 50 "),
        ]))
        .unwrap();

        assert_eq!(config.database_path, "/var/lib/nomina/payroll.db");
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.default_page_size, 50);
        assert_eq!(config.max_page_size, 100);
    }

    #[test]
    fn test_invalid_values() {
        let err = EngineConfig::from_lookup(lookup(&[("NOMINA_MAX_PAGE_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref name) if name == "NOMINA_MAX_PAGE_SIZE"));

        let err = EngineConfig::from_lookup(lookup(&[("NOMINA_MAX_CONNECTIONS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));

        let err = EngineConfig::from_lookup(lookup(&[
            ("NOMINA_DEFAULT_PAGE_SIZE", "200"),
            ("NOMINA_MAX_PAGE_SIZE", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent(_)));
    }
}
