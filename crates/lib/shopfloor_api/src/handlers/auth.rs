//! Session request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use shopfloor_core::models::user::UserProfile;
use shopfloor_core::users::NewUser;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AccessTokenResponse, AuthStatusResponse, LoginRequest, LoginResponse, MessageResponse,
};
use crate::services::cookies::{REFRESH_COOKIE, clear_refresh_cookie, refresh_cookie};

const TOKEN_TYPE: &str = "Bearer";

/// `POST /users/login`: authenticate with email + password.
///
/// The access token goes in the body, the refresh token in an httpOnly cookie.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let (session, user) = state.sessions.login(&body.email, &body.password).await?;
    let jar = jar.add(refresh_cookie(
        &session.refresh_token,
        session.refresh_expires_in,
        state.config.cookie_secure,
    ));
    Ok((
        jar,
        Json(LoginResponse {
            access_token: session.access.token,
            token_type: TOKEN_TYPE.into(),
            expires_in: session.access.expires_in,
            user: user.profile(),
        }),
    ))
}

/// `POST /users/refresh`: exchange the refresh cookie for a new access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<Json<AccessTokenResponse>> {
    let refresh_token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".into()))?;
    let access = state.sessions.renew(&refresh_token).await?;
    Ok(Json(AccessTokenResponse {
        access_token: access.token,
        token_type: TOKEN_TYPE.into(),
        expires_in: access.expires_in,
    }))
}

/// `POST /users/logout`: revoke the presented access token and end the session.
pub async fn logout_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    state.sessions.revoke(&user.token).await?;
    let jar = jar.add(clear_refresh_cookie(state.config.cookie_secure));
    Ok((jar, Json(MessageResponse::new("Logged out successfully"))))
}

/// `GET /users/status`: whether a planner account exists yet.
pub async fn auth_status_handler(
    State(state): State<AppState>,
) -> AppResult<Json<AuthStatusResponse>> {
    let planner_exists = state.users.planner_exists().await?;
    Ok(Json(AuthStatusResponse { planner_exists }))
}

/// `POST /users/bootstrap`: create the first planner on an empty system.
pub async fn bootstrap_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewUser>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let user = state.users.bootstrap_planner(body).await?;
    Ok((StatusCode::CREATED, Json(user.profile())))
}
