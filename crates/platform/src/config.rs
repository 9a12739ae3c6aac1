//! Platform configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TECO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `TECO_HOST` - Bind address (default: 127.0.0.1)
//! - `TECO_PORT` - Listen port (default: 3000)
//! - `TECO_SEARCH_INDEX_DIR` - Directory of the store search index (default: in memory)
//! - `TECO_BROKER_URL` - Base URL of the message broker REST API; cache
//!   management messages are disabled when unset
//! - `TECO_BROKER_QUEUE` - Cache management queue (default: cache-server-management)
//! - `TECO_BROKER_USERNAME` / `TECO_BROKER_PASSWORD` - Broker basic auth
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default queue for cache management messages.
pub const DEFAULT_BROKER_QUEUE: &str = "cache-server-management";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Platform application configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory of the store search index; in memory when `None`
    pub search_index_dir: Option<PathBuf>,
    /// Message broker configuration; cache messages are disabled when `None`
    pub broker: Option<BrokerConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Message broker REST API configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct BrokerConfig {
    /// Base URL of the broker (e.g., `http://localhost:8161`)
    pub url: Url,
    /// Destination queue for cache management messages
    pub queue: String,
    /// Basic auth user name
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<SecretString>,
}

impl std::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("url", &self.url.as_str())
            .field("queue", &self.queue)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PlatformConfig {
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

        let database_url = get_database_url("TECO_DATABASE_URL")?;
        let host = parse_env("TECO_HOST", "127.0.0.1")?;
        let port = parse_env("TECO_PORT", "3000")?;
        let search_index_dir = get_optional_env("TECO_SEARCH_INDEX_DIR").map(PathBuf::from);
        let broker = BrokerConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            search_index_dir,
            broker,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl BrokerConfig {
    /// Load the broker configuration, or `None` when `TECO_BROKER_URL` is unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(url) = get_optional_env("TECO_BROKER_URL") else {
            return Ok(None);
        };
        let url = Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("TECO_BROKER_URL".to_string(), e.to_string()))?;

        Ok(Some(Self {
            url,
            queue: get_env_or_default("TECO_BROKER_QUEUE", DEFAULT_BROKER_QUEUE),
            username: get_optional_env("TECO_BROKER_USERNAME"),
            password: get_optional_env("TECO_BROKER_PASSWORD").map(SecretString::from),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming `primary_key` if neither is set
/// (blank values count as unset).
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    database_url_from(primary_key, get_optional_env)
}

fn database_url_from(
    primary_key: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    lookup(primary_key)
        .or_else(|| lookup("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn config() -> PlatformConfig {
        PlatformConfig {
            database_url: SecretString::from("postgres://localhost/teco"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            search_index_dir: None,
            broker: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_parse_value() {
        let port: u16 = parse_value("TECO_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);

        let err = parse_value::<u16>("TECO_PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "TECO_PORT"));
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.trim().is_empty())
        }
    }

    #[test]
    fn test_database_url_prefers_primary_key() {
        let url = database_url_from(
            "TECO_DATABASE_URL",
            lookup(&[
                ("TECO_DATABASE_URL", "postgres://primary/db"),
                ("DATABASE_URL", "postgres://fallback/db"),
            ]),
        )
        .unwrap();
        assert_eq!(url.expose_secret(), "postgres://primary/db");
    }

    #[test]
    fn test_blank_database_url_falls_back() {
        let url = database_url_from(
            "TECO_DATABASE_URL",
            lookup(&[
                ("TECO_DATABASE_URL", "  "),
                ("DATABASE_URL", "postgres://fallback/db"),
            ]),
        )
        .unwrap();
        assert_eq!(url.expose_secret(), "postgres://fallback/db");

        let err = database_url_from(
            "TECO_DATABASE_URL",
            lookup(&[("TECO_DATABASE_URL", ""), ("DATABASE_URL", " ")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "TECO_DATABASE_URL"));
    }

    #[test]
    fn test_database_url_debug_is_redacted() {
        let debug_output = format!("{:?}", config());
        assert!(!debug_output.contains("postgres://localhost/teco"));
    }

    #[test]
    fn test_broker_config_debug_redacts_password() {
        let broker = BrokerConfig {
            url: Url::parse("http://broker.internal:8161").unwrap(),
            queue: DEFAULT_BROKER_QUEUE.to_string(),
            username: Some("admin".to_string()),
            password: Some(SecretString::from("super_secret_broker_password")),
        };

        let debug_output = format!("{broker:?}");

        assert!(debug_output.contains("broker.internal"));
        assert!(debug_output.contains("admin"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_broker_password"));
    }
}
