//! Refresh token cookie.
//!
//! The cookie is httpOnly and scoped to the `/users` routes, so it only
//! travels with login, refresh and logout requests.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::routes::REFRESH_COOKIE_PATH;

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "shopfloor_refresh";

/// Build a httpOnly cookie carrying the refresh token.
pub fn refresh_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(REFRESH_COOKIE_PATH)
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Build an expired cookie to clear the refresh token.
pub fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE.to_string(), String::new()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(REFRESH_COOKIE_PATH)
        .max_age(Duration::ZERO)
        .build()
}
