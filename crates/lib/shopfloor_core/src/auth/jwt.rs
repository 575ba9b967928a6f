//! JWT token generation and verification.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::de::DeserializeOwned;
use tracing::info;

use super::{AuthError, TokenError};
use crate::models::auth::{AccessClaims, RefreshClaims};
use crate::models::user::{Role, User};

/// Default access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Default refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_EXPIRY_SECS: i64 = 7 * 24 * 60 * 60;

fn sign<C: serde::Serialize>(claims: &C, secret: &[u8]) -> Result<String, AuthError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret))
        .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
}

/// Generate a signed access token (HS256) for `user`.
pub fn generate_access_token(
    user: &User,
    ttl_secs: i64,
    secret: &[u8],
) -> Result<(String, AccessClaims), AuthError> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
        admin: user.role == Role::Planner,
        jti: uuid::Uuid::new_v4().to_string(),
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };
    Ok((sign(&claims, secret)?, claims))
}

/// Generate a signed refresh token bound to the user's current epoch.
pub fn generate_refresh_token(
    user: &User,
    ttl_secs: i64,
    secret: &[u8],
) -> Result<(String, RefreshClaims), AuthError> {
    let now = Utc::now();
    let claims = RefreshClaims {
        sub: user.id.clone(),
        epoch: user.token_epoch,
        jti: uuid::Uuid::new_v4().to_string(),
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };
    Ok((sign(&claims, secret)?, claims))
}

fn verify<C: DeserializeOwned>(token: &str, secret: &[u8]) -> Result<C, TokenError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;
    decode::<C>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        })
}

/// Verify signature and expiry of an access token.
pub fn verify_access_token(token: &str, secret: &[u8]) -> Result<AccessClaims, TokenError> {
    verify(token, secret)
}

/// Verify signature and expiry of a refresh token.
pub fn verify_refresh_token(token: &str, secret: &[u8]) -> Result<RefreshClaims, TokenError> {
    verify(token, secret)
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shopfloor")
        .join("jwt-secret")
}
