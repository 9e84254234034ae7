//! Gateway configuration.
//!
//! Configuration is loaded from environment variables once at startup.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:4000";

/// Default backend services, as `name=url` pairs.
pub const DEFAULT_SERVICES: &str =
    "users=http://localhost:4001/graphql,posts=http://localhost:4002/graphql,comments=http://localhost:4003/graphql";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default drain period on shutdown in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 0;

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:4000").
    pub bind_address: String,

    /// Backend services by name. Each URL receives the forwarded body.
    pub services: BTreeMap<String, String>,

    /// Timeout applied to each client request, backend call included.
    pub request_timeout: Duration,

    /// Seconds to keep serving in-flight requests after a shutdown signal.
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid service list: {0}")]
    InvalidServices(String),

    #[error("Invalid request timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid drain period: {0}")]
    InvalidDrain(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("GATEWAY_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let services = parse_services(
            vars.get("GATEWAY_SERVICES")
                .map_or(DEFAULT_SERVICES, String::as_str),
        )?;

        let request_timeout = match vars.get("GATEWAY_REQUEST_TIMEOUT_SECONDS") {
            Some(value_str) => {
                let seconds: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidTimeout(format!(
                        "GATEWAY_REQUEST_TIMEOUT_SECONDS must be a valid integer, got '{value_str}': {e}"
                    ))
                })?;
                if seconds == 0 {
                    return Err(ConfigError::InvalidTimeout(
                        "GATEWAY_REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }
                Duration::from_secs(seconds)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        };

        let drain_seconds = match vars.get("GATEWAY_DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrain(format!(
                    "GATEWAY_DRAIN_SECONDS must be a valid integer, got '{value_str}': {e}"
                ))
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Self {
            bind_address,
            services,
            request_timeout,
            drain_seconds,
        })
    }
}

/// Parse `name=url,name=url`.
///
/// Names become path segments, so they are limited to ASCII alphanumerics,
/// `-` and `_`. URLs must be http or https.
fn parse_services(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut services = BTreeMap::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, url) = entry.split_once('=').ok_or_else(|| {
            ConfigError::InvalidServices(format!("entry '{entry}' is not name=url"))
        })?;
        let (name, url) = (name.trim(), url.trim());

        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidServices(format!(
                "service name '{name}' must be non-empty and contain only [A-Za-z0-9_-]"
            )));
        }

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidServices(format!(
                "service '{name}' URL must start with http:// or https://"
            )));
        }

        if services.insert(name.to_string(), url.to_string()).is_some() {
            return Err(ConfigError::InvalidServices(format!(
                "service '{name}' is listed twice"
            )));
        }
    }

    if services.is_empty() {
        return Err(ConfigError::InvalidServices(
            "at least one service is required".to_string(),
        ));
    }

    Ok(services)
}
