//! Session credential models.

use serde::{Deserialize, Serialize};

use super::user::Role;

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id (JWT `sub` claim).
    pub sub: String,
    /// User email.
    pub email: String,
    pub role: Role,
    /// Planners administer job orders and users.
    pub admin: bool,
    /// Unique token id, so two tokens issued in the same second differ.
    pub jti: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// JWT claims embedded in refresh (renewable) tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    /// User's `tokenEpoch` at issue time.
    pub epoch: u64,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: i64,
}

/// Access + refresh token pair returned by login.
#[derive(Debug, Clone)]
pub struct Session {
    pub access: AccessToken,
    pub refresh_token: String,
    pub refresh_expires_in: i64,
}
