use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::saved_recipe::{RecipeData, SavedRecipe};
use serde::{Deserialize, Serialize};
use services::services::meal_planner::current_week_start;
use tracing::info;
use ts_rs::TS;
use utils::{response::ApiResponse, text::non_blank};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::auth::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct SavedRecipeQuery {
    pub liked: Option<bool>,
}

/// A swipe: the recipe as shown on the card plus the decision.
#[derive(Debug, Deserialize, TS)]
pub struct SaveRecipeRequest {
    #[serde(flatten)]
    pub recipe: RecipeData,
    pub liked: bool,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecipeResponse {
    pub saved_recipe: SavedRecipe,
    /// Weekday the liked recipe landed on in this week's plan.
    pub assigned_day: Option<i64>,
    pub replaced_recipe_id: Option<Uuid>,
}

#[derive(Debug, Serialize, TS)]
pub struct DeletedCount {
    #[ts(type = "number")]
    pub deleted: u64,
}

/// GET /api/saved-recipes?liked=
pub async fn list_saved_recipes(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Query(query): Query<SavedRecipeQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<SavedRecipe>>>, ApiError> {
    let recipes = SavedRecipe::find_by_user(&state.db.pool, auth.user.id, query.liked).await?;
    Ok(ResponseJson(ApiResponse::success(recipes)))
}

/// POST /api/saved-recipes
/// Saving the same recipeId again updates the existing row. A like is
/// planned into the current week; a dismiss takes it out again.
pub async fn save_recipe(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    axum::Json(payload): axum::Json<SaveRecipeRequest>,
) -> Result<ResponseJson<ApiResponse<SaveRecipeResponse>>, ApiError> {
    if non_blank(Some(payload.recipe.recipe_id.as_str())).is_none() {
        return Err(ApiError::BadRequest("recipeId is required".to_string()));
    }
    if non_blank(Some(payload.recipe.title.as_str())).is_none() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let saved =
        SavedRecipe::upsert(&state.db.pool, auth.user.id, &payload.recipe, payload.liked).await?;
    let week_start = current_week_start();

    let (assigned_day, replaced_recipe_id) = if saved.liked {
        let assignment = state
            .planner
            .auto_assign(auth.user.id, &saved, week_start)
            .await?;
        (
            Some(assignment.entry.day_of_week),
            assignment.replaced_recipe_id,
        )
    } else {
        state
            .planner
            .unplan_recipe(auth.user.id, saved.id, week_start)
            .await?;
        (None, None)
    };

    info!(
        user_id = %auth.user.id,
        recipe_id = %saved.recipe_id,
        liked = saved.liked,
        assigned_day,
        "Saved swipe"
    );

    Ok(ResponseJson(ApiResponse::success(SaveRecipeResponse {
        saved_recipe: saved,
        assigned_day,
        replaced_recipe_id,
    })))
}

/// DELETE /api/saved-recipes/{id}
pub async fn delete_saved_recipe(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let deleted = SavedRecipe::delete_for_user(&state.db.pool, id, auth.user.id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("saved recipe"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// DELETE /api/saved-recipes/dismissed
/// Puts every dismissed recipe back into the swipe deck.
pub async fn clear_dismissed(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> Result<ResponseJson<ApiResponse<DeletedCount>>, ApiError> {
    let deleted = SavedRecipe::delete_dismissed(&state.db.pool, auth.user.id).await?;
    Ok(ResponseJson(ApiResponse::success(DeletedCount { deleted })))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/saved-recipes",
        Router::new()
            .route("/", get(list_saved_recipes).post(save_recipe))
            .route("/dismissed", delete(clear_dismissed))
            .route("/{id}", delete(delete_saved_recipe)),
    )
}
