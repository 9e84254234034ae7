//! Identity configuration.
//!
//! Loaded once from environment variables at startup. The key mode chosen
//! here is fixed for the life of the process.

use crate::keys::remote::{
    CacheSettings, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECONDS,
    DEFAULT_FETCH_TIMEOUT_SECONDS, DEFAULT_REQUESTS_PER_MINUTE,
};
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Value of `IDENTITY_ENV` that selects production (remote key set) mode.
pub const PRODUCTION_ENV: &str = "production";

/// Default path of the development public key.
pub const DEFAULT_LOCAL_KEY_PATH: &str = "public-key.pem";

/// Remote key-set settings used in production mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteKeyConfig {
    /// URL of the JWKS document.
    pub jwks_url: String,

    /// Fetch budget per rolling minute.
    pub requests_per_minute: u32,

    /// Cached key lifetime.
    pub cache_ttl: Duration,

    /// Maximum number of cached keys.
    pub cache_max_entries: usize,

    /// Timeout for one key-set fetch.
    pub fetch_timeout: Duration,
}

impl RemoteKeyConfig {
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            requests_per_minute: self.requests_per_minute,
            ttl: self.cache_ttl,
            max_entries: self.cache_max_entries,
        }
    }
}

/// Where verification keys come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMode {
    /// One local public key, read from disk at startup.
    Development {
        local_key_path: PathBuf,
        local_key_algorithm: Algorithm,
    },

    /// Keys fetched from a JWKS endpoint and cached.
    Production(RemoteKeyConfig),
}

/// Identity configuration shared by every backend service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub mode: KeyMode,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl IdentityConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let is_production = vars
            .get("IDENTITY_ENV")
            .is_some_and(|value| value == PRODUCTION_ENV);

        let mode = if is_production {
            let jwks_url = vars
                .get("IDENTITY_JWKS_URL")
                .filter(|url| !url.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar("IDENTITY_JWKS_URL".to_string()))?
                .clone();

            KeyMode::Production(RemoteKeyConfig {
                jwks_url,
                requests_per_minute: parse_positive(
                    vars,
                    "IDENTITY_JWKS_REQUESTS_PER_MINUTE",
                    DEFAULT_REQUESTS_PER_MINUTE,
                )?,
                cache_ttl: Duration::from_secs(parse_positive(
                    vars,
                    "IDENTITY_KEY_CACHE_TTL_SECONDS",
                    DEFAULT_CACHE_TTL_SECONDS,
                )?),
                cache_max_entries: parse_positive(
                    vars,
                    "IDENTITY_KEY_CACHE_MAX_ENTRIES",
                    DEFAULT_CACHE_MAX_ENTRIES,
                )?,
                fetch_timeout: Duration::from_secs(parse_positive(
                    vars,
                    "IDENTITY_JWKS_TIMEOUT_SECONDS",
                    DEFAULT_FETCH_TIMEOUT_SECONDS,
                )?),
            })
        } else {
            let local_key_path = vars
                .get("IDENTITY_LOCAL_KEY_PATH")
                .cloned()
                .unwrap_or_else(|| DEFAULT_LOCAL_KEY_PATH.to_string());

            let local_key_algorithm = match vars.get("IDENTITY_LOCAL_KEY_ALGORITHM") {
                Some(value) => {
                    Algorithm::from_str(value).map_err(|e| ConfigError::InvalidValue {
                        name: "IDENTITY_LOCAL_KEY_ALGORITHM".to_string(),
                        reason: format!("'{value}': {e}"),
                    })?
                }
                None => Algorithm::EdDSA,
            };

            KeyMode::Development {
                local_key_path: PathBuf::from(local_key_path),
                local_key_algorithm,
            }
        };

        Ok(Self { mode })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.mode, KeyMode::Production(_))
    }
}

/// Parse an optional positive integer, falling back to `default`.
fn parse_positive<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: T = value_str.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("must be a valid positive integer, got '{value_str}': {e}"),
    })?;

    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    Ok(value)
}
