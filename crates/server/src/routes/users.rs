use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use db::models::user::{User, UserInfo};
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;
use utils::{response::ApiResponse, text::non_blank};

use crate::{
    AppState,
    error::ApiError,
    middleware::auth::{CurrentUser, removal_cookie},
};

#[derive(Debug, Deserialize, TS)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
}

/// GET /api/users/me
pub async fn get_profile(CurrentUser(auth): CurrentUser) -> ResponseJson<ApiResponse<UserInfo>> {
    ResponseJson(ApiResponse::success(auth.user.to_info()))
}

/// PUT /api/users/me
/// A blank name clears it.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    axum::Json(payload): axum::Json<UpdateProfileRequest>,
) -> Result<ResponseJson<ApiResponse<UserInfo>>, ApiError> {
    let user = User::update_name(
        &state.db.pool,
        auth.user.id,
        non_blank(payload.name.as_deref()),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(user.to_info())))
}

/// DELETE /api/users/me
/// Removes the account and everything it owns, then clears the session cookie.
pub async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    jar: CookieJar,
) -> Result<(CookieJar, ResponseJson<ApiResponse<()>>), ApiError> {
    User::delete(&state.db.pool, auth.user.id).await?;
    info!(user_id = %auth.user.id, "Deleted account");
    Ok((jar.remove(removal_cookie()), ResponseJson(ApiResponse::success(()))))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/users/me",
        get(get_profile).put(update_profile).delete(delete_account),
    )
}
