//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::lock::LockSettings;
use crate::policy::{WithdrawalPolicy, WithdrawalPolicyConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Time zone used for withdrawal windows, daily limits and snapshot periods
    pub ledger_timezone: Tz,

    pub lock_max_attempts: u32,
    pub lock_retry_delay: Duration,
    pub lock_ttl: Duration,

    /// How often the scheduler checks whether a monthly snapshot run is due
    pub snapshot_check_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_or("PORT", 3000)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let ledger_timezone = match env::var("LEDGER_TIMEZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidValue("LEDGER_TIMEZONE"))?,
            Err(_) => Tz::UTC,
        };

        let lock_max_attempts: u32 = parse_or("LOCK_MAX_ATTEMPTS", 5)?;
        if lock_max_attempts == 0 {
            return Err(ConfigError::InvalidValue("LOCK_MAX_ATTEMPTS"));
        }
        let lock_retry_delay = Duration::from_millis(parse_or("LOCK_RETRY_DELAY_MS", 50)?);
        let lock_ttl = Duration::from_secs(parse_or("LOCK_TTL_SECONDS", 30)?);

        let snapshot_check_interval =
            Duration::from_secs(parse_or("SNAPSHOT_CHECK_INTERVAL_SECONDS", 3600)?);
        if snapshot_check_interval.is_zero() {
            return Err(ConfigError::InvalidValue("SNAPSHOT_CHECK_INTERVAL_SECONDS"));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            ledger_timezone,
            lock_max_attempts,
            lock_retry_delay,
            lock_ttl,
            snapshot_check_interval,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn lock_settings(&self) -> LockSettings {
        LockSettings {
            max_attempts: self.lock_max_attempts,
            retry_delay: self.lock_retry_delay,
            ttl: self.lock_ttl,
        }
    }

    /// Withdrawal policy with the default limit tables in the ledger time zone
    pub fn policy(&self) -> WithdrawalPolicy {
        WithdrawalPolicy::new(WithdrawalPolicyConfig::default(), self.ledger_timezone)
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
