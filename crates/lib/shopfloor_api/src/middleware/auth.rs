//! Authentication middleware: Bearer token extraction and session verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shopfloor_core::authz::Principal;
use shopfloor_core::models::auth::AccessClaims;

use crate::AppState;
use crate::error::AppError;

/// Verified caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: AccessClaims,
    /// Raw bearer token, kept so logout can revoke it.
    pub token: String,
}

impl AuthenticatedUser {
    pub fn principal(&self) -> Principal {
        Principal::from_claims(&self.claims)
    }
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies it
/// against the revocation ledger and the signing key, and injects
/// `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?
        .to_string();

    let claims = state.sessions.verify(&token).await?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { claims, token });

    Ok(next.run(request).await)
}
