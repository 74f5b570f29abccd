use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::saved_recipe::SavedRecipe;
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::clamp_limit;
use crate::{AppState, error::ApiError, middleware::auth::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct RecipeQuery {
    pub limit: Option<i64>,
}

/// GET /api/recipes?limit=
/// The swipe deck: catalog recipes the caller has neither liked nor dismissed.
pub async fn list_recipes(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Query(query): Query<RecipeQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<SavedRecipe>>>, ApiError> {
    let recipes =
        SavedRecipe::find_unseen_catalog(&state.db.pool, auth.user.id, clamp_limit(query.limit))
            .await?;
    Ok(ResponseJson(ApiResponse::success(recipes)))
}

/// GET /api/recipes/{id}
pub async fn get_recipe(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<SavedRecipe>>, ApiError> {
    let recipe = SavedRecipe::find_catalog_by_id(&state.db.pool, id)
        .await?
        .ok_or(ApiError::NotFound("recipe"))?;
    Ok(ResponseJson(ApiResponse::success(recipe)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/{id}", get(get_recipe))
}
