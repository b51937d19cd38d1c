//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (postgres backend)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 5000)
//! - `STOREFRONT_INVENTORY_BACKEND` - `postgres` or `memory` (default: postgres)
//! - `STOREFRONT_SEED_FILE` - Catalog YAML loaded into the memory backend at startup
//! - `STOREFRONT_ORDER_TIMEOUT_MS` - Upper bound on one order commit (default: 5000)
//! - `STOREFRONT_TOTAL_POLICY` - `verify` or `recompute` (default: verify)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which store backs the order API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InventoryBackend {
    #[default]
    Postgres,
    /// In-process store; state is lost on restart.
    Memory,
}

impl FromStr for InventoryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

/// How the client-submitted order total is treated.
///
/// In both modes the stored total is the server's own computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotalPolicy {
    /// Reject the order if the submitted total differs by more than one cent.
    #[default]
    Verify,
    /// Ignore the submitted total.
    Recompute,
}

impl FromStr for TotalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verify" => Ok(Self::Verify),
            "recompute" => Ok(Self::Recompute),
            other => Err(format!("expected 'verify' or 'recompute', got '{other}'")),
        }
    }
}

/// Order placement settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderConfig {
    /// Upper bound on one commit, including waiting for row locks.
    pub timeout: Duration,
    pub total_policy: TotalPolicy,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            total_policy: TotalPolicy::Verify,
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password).
    /// Only required for the postgres backend.
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    pub inventory_backend: InventoryBackend,
    /// Seed file for the memory backend
    pub seed_file: Option<PathBuf>,
    pub orders: OrderConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let inventory_backend: InventoryBackend =
            parse_env_or_default("STOREFRONT_INVENTORY_BACKEND", "postgres")?;
        let database_url = match inventory_backend {
            InventoryBackend::Postgres => Some(get_database_url("STOREFRONT_DATABASE_URL")?),
            InventoryBackend::Memory => None,
        };

        let timeout_ms: u64 = parse_env_or_default("STOREFRONT_ORDER_TIMEOUT_MS", "5000")?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_ORDER_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host: parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?,
            port: parse_env_or_default("STOREFRONT_PORT", "5000")?,
            inventory_backend,
            seed_file: get_optional_env("STOREFRONT_SEED_FILE").map(PathBuf::from),
            orders: OrderConfig {
                timeout: Duration::from_millis(timeout_ms),
                total_policy: parse_env_or_default("STOREFRONT_TOTAL_POLICY", "verify")?,
            },
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Configuration for an in-memory store bound to localhost, with no
    /// external services.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5000,
            inventory_backend: InventoryBackend::Memory,
            seed_file: None,
            orders: OrderConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, using `default` when it is unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!(
            "memory".parse::<InventoryBackend>().unwrap(),
            InventoryBackend::Memory
        );
        assert_eq!(
            "Postgres".parse::<InventoryBackend>().unwrap(),
            InventoryBackend::Postgres
        );
        assert!("redis".parse::<InventoryBackend>().is_err());
    }

    #[test]
    fn test_total_policy_parsing() {
        assert_eq!("verify".parse::<TotalPolicy>().unwrap(), TotalPolicy::Verify);
        assert_eq!(
            "RECOMPUTE".parse::<TotalPolicy>().unwrap(),
            TotalPolicy::Recompute
        );
        assert!("trust".parse::<TotalPolicy>().is_err());
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("STOREFRONT_PORT", "http").unwrap_err();
        match err {
            ConfigError::InvalidEnvVar(key, _) => assert_eq!(key, "STOREFRONT_PORT"),
            ConfigError::MissingEnvVar(_) => panic!("wrong variant"),
        }
        assert_eq!(parse_value::<u16>("STOREFRONT_PORT", " 8080 ").unwrap(), 8080);
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            port: 5050,
            ..StorefrontConfig::in_memory()
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5050);
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = StorefrontConfig {
            database_url: Some(SecretString::from("postgres://souk:hunter2@db/souk")),
            ..StorefrontConfig::in_memory()
        };
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
