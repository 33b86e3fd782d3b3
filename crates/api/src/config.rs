use std::time::Duration;

use cinebook_core::booking::BookingConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Grace period for in-flight requests after a shutdown signal (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Bounded wait for seat locks in milliseconds (default: `2000`).
    pub seat_lock_wait_ms: u64,
    /// Bound on persisting a booking in seconds (default: `10`).
    pub booking_persist_timeout_secs: u64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `3000`                  |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`        | `30`                    |
    /// | `SEAT_LOCK_WAIT_MS`            | `2000`                  |
    /// | `BOOKING_PERSIST_TIMEOUT_SECS` | `10`                    |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            seat_lock_wait_ms: env_or("SEAT_LOCK_WAIT_MS", 2_000),
            booking_persist_timeout_secs: env_or("BOOKING_PERSIST_TIMEOUT_SECS", 10),
            jwt: JwtConfig::from_env(),
        }
    }

    /// Engine tuning derived from this configuration.
    pub fn booking(&self) -> BookingConfig {
        BookingConfig {
            seat_lock_wait: Duration::from_millis(self.seat_lock_wait_ms),
            persist_timeout: Duration::from_secs(self.booking_persist_timeout_secs),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid value: {e}")),
        Err(_) => default,
    }
}
