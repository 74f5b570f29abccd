//! Session cookie handling and the authenticated-user extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use services::services::auth::AuthenticatedUser;

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "mealmatch_session";

/// Session cookie for a freshly opened session.
pub fn session_cookie(token: String, ttl: chrono::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

/// Cookie value that makes the browser drop the session cookie.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Any signed-in user. Rejects with 401.
pub struct CurrentUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = session_token(&jar).ok_or(ApiError::Unauthorized)?;
        let auth = state.auth.authenticate(&token).await?;
        Ok(Self(auth))
    }
}

/// A signed-in admin. Rejects with 401 when anonymous and 403 for regular users.
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(auth) = CurrentUser::from_request_parts(parts, state).await?;
        if !auth.user.is_admin() {
            return Err(ApiError::Forbidden);
        }
        Ok(Self(auth))
    }
}
