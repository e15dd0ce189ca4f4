//! Service configuration loaded once at startup

use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// # Environment Variables
    /// - `SERVER_ADDR`: Listen address (default: 0.0.0.0:3000)
    pub fn from_env() -> Result<Self> {
        let addr = std::env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid SERVER_ADDR: {}", e))?;

        Ok(Self { addr })
    }
}

/// Retry policy of the background last-seen update
#[derive(Debug, Clone, Copy)]
pub struct LastSeenConfig {
    /// Number of attempts before giving up
    pub attempts: u32,
    /// Fixed delay between attempts
    pub backoff: Duration,
    /// Deadline of each attempt
    pub attempt_timeout: Duration,
}

impl Default for LastSeenConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

/// Session engine configuration
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Deadline applied to every store call made while serving a request
    pub store_timeout: Duration,
    /// Attempts at persisting a new session before giving up on id collisions
    pub create_attempts: u32,
    /// Background last-seen update policy
    pub last_seen: LastSeenConfig,
    /// Period of the expired-session purge
    pub purge_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            create_attempts: 5,
            last_seen: LastSeenConfig::default(),
            purge_interval: Duration::from_secs(3600),
        }
    }
}

impl SessionConfig {
    /// # Environment Variables
    /// - `STORE_TIMEOUT_MS`: Deadline of each store call (default: 5000)
    /// - `SESSION_CREATE_ATTEMPTS`: Session id collision retries (default: 5)
    /// - `LAST_SEEN_ATTEMPTS`: Last-seen update attempts (default: 3)
    /// - `LAST_SEEN_BACKOFF_MS`: Delay between last-seen attempts (default: 200)
    /// - `SESSION_PURGE_INTERVAL_SECS`: Expired-session purge period (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let store_timeout = Duration::from_millis(env_or(
            "STORE_TIMEOUT_MS",
            defaults.store_timeout.as_millis() as u64,
        ));

        Self {
            store_timeout,
            create_attempts: env_or("SESSION_CREATE_ATTEMPTS", defaults.create_attempts).max(1),
            last_seen: LastSeenConfig {
                attempts: env_or("LAST_SEEN_ATTEMPTS", defaults.last_seen.attempts).max(1),
                backoff: Duration::from_millis(env_or(
                    "LAST_SEEN_BACKOFF_MS",
                    defaults.last_seen.backoff.as_millis() as u64,
                )),
                attempt_timeout: store_timeout,
            },
            purge_interval: Duration::from_secs(
                env_or(
                    "SESSION_PURGE_INTERVAL_SECS",
                    defaults.purge_interval.as_secs(),
                )
                .max(1),
            ),
        }
    }
}

/// Credentials of the admin account seeded at startup
#[derive(Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

impl AdminConfig {
    /// # Environment Variables
    /// - `ADMIN_EMAIL`, `ADMIN_PASSWORD`: both must be set to seed an admin
    pub fn from_env() -> Option<Self> {
        let email = std::env::var("ADMIN_EMAIL").ok()?;
        let password = std::env::var("ADMIN_PASSWORD").ok()?;
        Some(Self { email, password })
    }
}
