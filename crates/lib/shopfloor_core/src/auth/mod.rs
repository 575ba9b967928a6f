//! Authentication: password hashing, JWT handling, and the session lifecycle.
//!
//! Shared by the API layer; nothing here knows about HTTP.

pub mod jwt;
pub mod password;
pub mod session;

use thiserror::Error;

use crate::store::StoreError;

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token is revoked")]
    Revoked,

    #[error("Token is expired")]
    Expired,

    #[error("Token is malformed")]
    Malformed,

    /// Refresh token no longer matches the user's current epoch or stored hash.
    #[error("Token has been superseded")]
    Superseded,
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
