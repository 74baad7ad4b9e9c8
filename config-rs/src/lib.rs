//! config-rs/lib.rs
//! Environment configuration for the API kit server
//! Reads `API_KIT_*` variables (plus the container `PORT`), with `.env` support

use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Prefix shared by every application variable
pub const ENV_PREFIX: &str = "API_KIT";

/// Environment name that switches on production behaviour (JSON logs)
pub const PRODUCTION_ENV: &str = "production";

pub const DEFAULT_PORT: u16 = 8080;

/// Limit for request bodies (10 MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 620;

pub const DEFAULT_ALLOWED_CONTENT_TYPE: &str = "application/json";

/// Errors raised while reading configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed into the expected type
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// Server and application settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Deployment environment, `production` unless overridden
    pub env: String,
    /// Maximum number of request body bytes read per request
    pub max_body_size: usize,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    /// The single media type accepted for write requests
    pub allowed_content_type: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            env: PRODUCTION_ENV.to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            write_timeout_secs: DEFAULT_WRITE_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            allowed_content_type: DEFAULT_ALLOWED_CONTENT_TYPE.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment
    ///
    /// A `.env` file in the working directory is read first if present;
    /// variables already set in the environment take precedence over it.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenv::dotenv() {
            log::debug!("No .env file loaded: {}", err);
        }
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    ///
    /// # Arguments
    /// * `lookup` - Returns the raw value of a variable, or `None` if unset
    ///
    /// # Returns
    /// The configuration, or the first variable that failed to parse
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            env: lookup_non_empty(&lookup, &prefixed("ENV")).unwrap_or(defaults.env),
            max_body_size: parse_or(&lookup, &prefixed("MAX_BODY_SIZE"), defaults.max_body_size)?,
            read_timeout_secs: parse_or(&lookup, &prefixed("READ_TIMEOUT"), defaults.read_timeout_secs)?,
            write_timeout_secs: parse_or(&lookup, &prefixed("WRITE_TIMEOUT"), defaults.write_timeout_secs)?,
            idle_timeout_secs: parse_or(&lookup, &prefixed("IDLE_TIMEOUT"), defaults.idle_timeout_secs)?,
            allowed_content_type: lookup_non_empty(&lookup, &prefixed("ALLOWED_CONTENT_TYPE"))
                .unwrap_or(defaults.allowed_content_type),
            port: parse_or(&lookup, "PORT", defaults.port)?,
        };

        log::debug!(
            "Loaded configuration: env={}, port={}, max_body_size={}",
            config.env,
            config.port,
            config.max_body_size
        );

        Ok(config)
    }

    /// Returns true if the environment is production
    pub fn is_production(&self) -> bool {
        self.env == PRODUCTION_ENV
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Create a SocketAddr for binding the server
    ///
    /// # Arguments
    /// * `port_override` - Port to use instead of the configured one
    ///
    /// # Returns
    /// All interfaces on the chosen port; loopback only on Windows to avoid
    /// the firewall prompt for local development
    pub fn bind_address(&self, port_override: Option<u16>) -> SocketAddr {
        let port = port_override.unwrap_or(self.port);
        let ip = if cfg!(windows) {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
        SocketAddr::new(ip, port)
    }
}

fn prefixed(name: &str) -> String {
    format!("{}_{}", ENV_PREFIX, name)
}

fn lookup_non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup_non_empty(lookup, name) {
        Some(raw) => raw.parse::<T>().map_err(|err| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
            reason: err.to_string(),
        }),
        None => Ok(default),
    }
}
