//! Process configuration, read once from the environment at startup.

use std::env;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_pool_size: u32,
    pub session_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable source. Used directly by tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = parse_or("BIND_ADDR", lookup("BIND_ADDR"), || {
            DEFAULT_BIND_ADDR.parse().map_err(|_| ConfigError::Missing("BIND_ADDR"))
        })?;

        let db_pool_size: u32 = parse_or("DB_POOL_SIZE", lookup("DB_POOL_SIZE"), || {
            Ok(DEFAULT_POOL_SIZE)
        })?;
        if db_pool_size == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_POOL_SIZE",
                value: db_pool_size.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let session_ttl_days: i64 = parse_or("SESSION_TTL_DAYS", lookup("SESSION_TTL_DAYS"), || {
            Ok(DEFAULT_SESSION_TTL_DAYS)
        })?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                name: "SESSION_TTL_DAYS",
                value: session_ttl_days.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Config {
            database_url,
            bind_addr,
            db_pool_size,
            session_ttl_days,
        })
    }
}

fn parse_or<T, D>(name: &'static str, raw: Option<String>, default: D) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    D: FnOnce() -> Result<T, ConfigError>,
{
    match raw {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                value: value.clone(),
                reason: e.to_string(),
            })
        }
        _ => default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/loafly")]))
            .unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.db_pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.session_ttl_days, DEFAULT_SESSION_TTL_DAYS);
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
        assert_eq!(err.to_string(), "DATABASE_URL must be set");
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/loafly"),
            ("DB_POOL_SIZE", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().starts_with("DB_POOL_SIZE"));

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/loafly"),
            ("SESSION_TTL_DAYS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SESSION_TTL_DAYS", .. }));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/loafly"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DB_POOL_SIZE", "4"),
            ("SESSION_TTL_DAYS", "7"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.db_pool_size, 4);
        assert_eq!(config.session_ttl_days, 7);
    }
}
