//! API server configuration.

use shopfloor_core::auth::jwt::{
    ACCESS_TOKEN_EXPIRY_SECS, REFRESH_TOKEN_EXPIRY_SECS, resolve_jwt_secret,
};
use shopfloor_core::auth::session::TokenSettings;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: i64,
    /// Set the `Secure` attribute on the refresh cookie.
    pub cookie_secure: bool,
}

fn env_secs(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v: &i64| *v > 0)
        .unwrap_or(default)
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                       | Default                                 |
    /// |--------------------------------|-----------------------------------------|
    /// | `BIND_ADDR`                    | `127.0.0.1:3100`                        |
    /// | `DATABASE_URL`                 | `postgres://localhost:5432/shopfloor`   |
    /// | `JWT_SECRET` / `AUTH_SECRET`   | generated & persisted to file           |
    /// | `ACCESS_TOKEN_TTL_SECS`        | `900`                                   |
    /// | `REFRESH_TOKEN_TTL_SECS`       | `604800`                                |
    /// | `COOKIE_SECURE`                | `false`                                 |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/shopfloor".into()),
            jwt_secret: resolve_jwt_secret(),
            access_ttl_secs: env_secs("ACCESS_TOKEN_TTL_SECS", ACCESS_TOKEN_EXPIRY_SECS),
            refresh_ttl_secs: env_secs("REFRESH_TOKEN_TTL_SECS", REFRESH_TOKEN_EXPIRY_SECS),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "yes")),
        }
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            access_ttl_secs: self.access_ttl_secs,
            refresh_ttl_secs: self.refresh_ttl_secs,
        }
    }
}
