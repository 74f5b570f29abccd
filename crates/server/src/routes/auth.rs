use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::CookieJar;
use db::models::user::UserInfo;
use serde::{Deserialize, Serialize};
use services::services::auth::AuthenticatedUser;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    middleware::auth::{CurrentUser, removal_cookie, session_cookie, session_token},
};

#[derive(Debug, Deserialize, TS)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, TS)]
pub struct LogoutResponse {
    pub success: bool,
}

fn with_session(state: &AppState, jar: CookieJar, auth: &AuthenticatedUser) -> CookieJar {
    jar.add(session_cookie(
        auth.session.token.clone(),
        state.auth.session_ttl(),
        state.config.secure_cookies(),
    ))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    axum::Json(payload): axum::Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, ResponseJson<ApiResponse<UserInfo>>), ApiError> {
    let auth = state
        .auth
        .register(&payload.email, &payload.password, payload.name.as_deref())
        .await?;
    let jar = with_session(&state, jar, &auth);

    Ok((
        StatusCode::CREATED,
        jar,
        ResponseJson(ApiResponse::success(auth.user.to_info())),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    axum::Json(payload): axum::Json<LoginRequest>,
) -> Result<(CookieJar, ResponseJson<ApiResponse<UserInfo>>), ApiError> {
    let auth = state.auth.login(&payload.email, &payload.password).await?;
    let jar = with_session(&state, jar, &auth);
    Ok((jar, ResponseJson(ApiResponse::success(auth.user.to_info()))))
}

/// POST /api/auth/logout
/// Succeeds without a session too; the cookie is cleared either way.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ResponseJson<ApiResponse<LogoutResponse>>), ApiError> {
    if let Some(token) = session_token(&jar) {
        state.auth.logout(&token).await?;
    }
    Ok((
        jar.remove(removal_cookie()),
        ResponseJson(ApiResponse::success(LogoutResponse { success: true })),
    ))
}

/// GET /api/auth/me
pub async fn me(CurrentUser(auth): CurrentUser) -> ResponseJson<ApiResponse<UserInfo>> {
    ResponseJson(ApiResponse::success(auth.user.to_info()))
}

/// PUT /api/auth/password
/// Other sessions of the user are signed out.
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    axum::Json(payload): axum::Json<ChangePasswordRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state
        .auth
        .change_password(&auth, &payload.current_password, &payload.new_password)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "password updated",
    )))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/me", get(me))
            .route("/password", put(change_password)),
    )
}
