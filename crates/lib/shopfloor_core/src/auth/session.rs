//! Session lifecycle: issue, verify, renew, revoke.
//!
//! Access tokens are short-lived JWTs checked against the revocation ledger on
//! every use. Refresh tokens are longer-lived JWTs bound to the user's
//! `tokenEpoch`; only one is live per user, identified by the SHA-256 stored on
//! the user document. Revoking bumps the epoch, which kills every outstanding
//! refresh token at once.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::jwt::{
    ACCESS_TOKEN_EXPIRY_SECS, REFRESH_TOKEN_EXPIRY_SECS, generate_access_token,
    generate_refresh_token, verify_access_token, verify_refresh_token,
};
use super::password::PasswordHasher;
use super::{AuthError, TokenError};
use crate::models::auth::{AccessClaims, AccessToken, Session};
use crate::models::user::User;
use crate::store::{Collection, Filter, RevocationLedger, Stores};

/// Token lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct TokenSettings {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_ttl_secs: ACCESS_TOKEN_EXPIRY_SECS,
            refresh_ttl_secs: REFRESH_TOKEN_EXPIRY_SECS,
        }
    }
}

/// Outcome of [`SessionManager::revoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revocation {
    /// `false` when the ledger write failed. The session is still ended on the
    /// user document, but the access token stays usable until it expires.
    pub ledger_recorded: bool,
}

/// SHA-256 hash a refresh token for storage.
fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct SessionManager {
    users: Arc<dyn Collection<User>>,
    ledger: Arc<dyn RevocationLedger>,
    hasher: Arc<dyn PasswordHasher>,
    secret: Vec<u8>,
    settings: TokenSettings,
}

impl SessionManager {
    pub fn new(
        stores: &Stores,
        hasher: Arc<dyn PasswordHasher>,
        secret: &[u8],
        settings: TokenSettings,
    ) -> Self {
        Self {
            users: stores.users.clone(),
            ledger: stores.ledger.clone(),
            hasher,
            secret: secret.to_vec(),
            settings,
        }
    }

    pub fn settings(&self) -> TokenSettings {
        self.settings
    }

    /// Authenticate with email + password and open a session.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<(Session, User), AuthError> {
        let user = self
            .users
            .find(&Filter::all().eq("email", email))
            .await?
            .into_iter()
            .next()
            .ok_or(AuthError::CredentialError)?;

        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(AuthError::CredentialError);
        }

        self.issue_session(user).await
    }

    /// Issue an access + refresh pair, replacing any previously stored refresh token.
    pub async fn issue_session(&self, mut user: User) -> Result<(Session, User), AuthError> {
        let (access, _) =
            generate_access_token(&user, self.settings.access_ttl_secs, &self.secret)?;
        let (refresh, _) =
            generate_refresh_token(&user, self.settings.refresh_ttl_secs, &self.secret)?;

        user.refresh_token_hash = Some(hash_refresh_token(&refresh));
        user.updated_at = Utc::now();
        if !self.users.replace(&user).await? {
            return Err(AuthError::CredentialError);
        }

        info!(user_id = %user.id, role = user.role.as_str(), "session issued");

        let session = Session {
            access: AccessToken {
                token: access,
                expires_in: self.settings.access_ttl_secs,
            },
            refresh_token: refresh,
            refresh_expires_in: self.settings.refresh_ttl_secs,
        };
        Ok((session, user))
    }

    /// Verify an access token: not revoked, then signature and expiry.
    pub async fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        if self.ledger.is_revoked(token, Utc::now()).await? {
            return Err(TokenError::Revoked.into());
        }
        Ok(verify_access_token(token, &self.secret)?)
    }

    /// Exchange a refresh token for a fresh access token.
    ///
    /// The refresh token is not rotated.
    pub async fn renew(&self, refresh_token: &str) -> Result<AccessToken, AuthError> {
        let claims = verify_refresh_token(refresh_token, &self.secret)?;

        let user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or(TokenError::Superseded)?;

        if claims.epoch != user.token_epoch {
            return Err(TokenError::Superseded.into());
        }
        let presented = hash_refresh_token(refresh_token);
        if user.refresh_token_hash.as_deref() != Some(presented.as_str()) {
            return Err(TokenError::Superseded.into());
        }

        let (token, _) =
            generate_access_token(&user, self.settings.access_ttl_secs, &self.secret)?;
        Ok(AccessToken {
            token,
            expires_in: self.settings.access_ttl_secs,
        })
    }

    /// End the session behind `token`.
    ///
    /// Clears the stored refresh token and bumps the epoch (fatal on failure),
    /// then records `token` in the ledger until its own expiry (best-effort).
    pub async fn revoke(&self, token: &str) -> Result<Revocation, AuthError> {
        let claims = verify_access_token(token, &self.secret)?;

        if let Some(mut user) = self.users.find_by_id(&claims.sub).await? {
            user.refresh_token_hash = None;
            user.token_epoch = user.token_epoch.saturating_add(1);
            user.updated_at = Utc::now();
            self.users.replace(&user).await?;
        }

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.settings.access_ttl_secs));

        let ledger_recorded = match self.ledger.insert(token, expires_at).await {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id = %claims.sub, error = %e, "revocation ledger write failed");
                false
            }
        };

        info!(user_id = %claims.sub, ledger_recorded, "session revoked");
        Ok(Revocation { ledger_recorded })
    }
}
