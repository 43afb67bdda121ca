//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARIGOLD_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)
//!
//! ## Optional
//! - `MARIGOLD_HOST` - Bind address (default: 127.0.0.1)
//! - `MARIGOLD_PORT` - Listen port (default: 8080)
//! - `MARIGOLD_TAX_RATE` - GST rate applied to the payable amount
//!   (default: 0.05)

use std::net::{IpAddr, SocketAddr};

use rust_decimal::Decimal;
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

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// GST rate applied to the rounded payable amount
    pub tax_rate: Decimal,
}

impl Config {
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

        let database_url = get_database_url("MARIGOLD_DATABASE_URL")?;
        let host = get_env_or_default("MARIGOLD_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("MARIGOLD_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("MARIGOLD_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("MARIGOLD_PORT".to_string(), e.to_string()))?;
        let tax_rate = parse_tax_rate(&get_env_or_default("MARIGOLD_TAX_RATE", "0.05"))
            .map_err(|e| ConfigError::InvalidEnvVar("MARIGOLD_TAX_RATE".to_string(), e))?;

        Ok(Self {
            database_url,
            host,
            port,
            tax_rate,
        })
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

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and bound-check a tax rate: a fraction in [0, 1).
fn parse_tax_rate(raw: &str) -> Result<Decimal, String> {
    let rate = raw
        .parse::<Decimal>()
        .map_err(|e| format!("not a decimal: {e}"))?;
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(format!("tax rate out of range: {rate}"));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_rate_parses_fractions() {
        assert_eq!(
            parse_tax_rate("0.05").expect("valid"),
            "0.05".parse::<Decimal>().expect("decimal")
        );
        assert_eq!(parse_tax_rate("0").expect("valid"), Decimal::ZERO);
    }

    #[test]
    fn tax_rate_rejects_garbage_and_out_of_range() {
        assert!(parse_tax_rate("five percent").is_err());
        assert!(parse_tax_rate("1").is_err());
        assert!(parse_tax_rate("-0.05").is_err());
    }
}
