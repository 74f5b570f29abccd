use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    meal_plan::MealPlan,
    saved_recipe::SavedRecipe,
    user::{User, UserInfo, UserRole},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use services::services::recipe_import::{
    ADMIN_ID_PREFIX, IMPORT_ID_PREFIX, ImportSummary, RecipeInput, import_recipes,
    parse_csv, parse_json_payload,
};
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::auth::AdminUser};

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    #[ts(type = "number")]
    pub users: i64,
    #[ts(type = "number")]
    pub catalog_recipes: i64,
    #[ts(type = "number")]
    pub liked_swipes: i64,
    #[ts(type = "number")]
    pub dismissed_swipes: i64,
    #[ts(type = "number")]
    pub meal_plans: i64,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

/// GET /api/admin/recipes
pub async fn list_catalog(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<ResponseJson<ApiResponse<Vec<SavedRecipe>>>, ApiError> {
    let recipes = SavedRecipe::find_catalog(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(recipes)))
}

/// POST /api/admin/recipes
pub async fn create_recipe(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    axum::Json(payload): axum::Json<RecipeInput>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<SavedRecipe>>), ApiError> {
    let data = payload.into_data(ADMIN_ID_PREFIX)?;
    if SavedRecipe::catalog_contains(&state.db.pool, &data.recipe_id).await? {
        return Err(ApiError::Conflict(format!(
            "recipeId {} already exists",
            data.recipe_id
        )));
    }

    let recipe = SavedRecipe::create(&state.db.pool, admin.user.id, &data, true).await?;
    info!(recipe_id = %recipe.recipe_id, "Added catalog recipe");
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(recipe))))
}

/// PUT /api/admin/recipes/{id}
/// Replaces the recipe content. The recipeId stays as it was.
pub async fn update_recipe(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<RecipeInput>,
) -> Result<ResponseJson<ApiResponse<SavedRecipe>>, ApiError> {
    let existing = SavedRecipe::find_catalog_by_id(&state.db.pool, id)
        .await?
        .ok_or(ApiError::NotFound("recipe"))?;

    let mut data = payload.into_data(ADMIN_ID_PREFIX)?;
    data.recipe_id = existing.recipe_id;

    let recipe = SavedRecipe::update_content(&state.db.pool, id, &data)
        .await?
        .ok_or(ApiError::NotFound("recipe"))?;
    Ok(ResponseJson(ApiResponse::success(recipe)))
}

/// DELETE /api/admin/recipes/{id}
pub async fn delete_recipe(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let existing = SavedRecipe::find_catalog_by_id(&state.db.pool, id)
        .await?
        .ok_or(ApiError::NotFound("recipe"))?;
    SavedRecipe::delete_for_user(&state.db.pool, existing.id, existing.user_id).await?;
    info!(recipe_id = %existing.recipe_id, "Removed catalog recipe");
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/admin/recipes/import/json
/// Body is `{ "recipes": [...] }` or a bare array.
pub async fn import_json(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    axum::Json(payload): axum::Json<Value>,
) -> Result<ResponseJson<ApiResponse<ImportSummary>>, ApiError> {
    let inputs = parse_json_payload(payload)?;
    let summary = import_recipes(&state.db.pool, admin.user.id, inputs, IMPORT_ID_PREFIX).await;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// POST /api/admin/recipes/import/csv
/// Body is the CSV document itself, header row first.
pub async fn import_csv(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    body: String,
) -> Result<ResponseJson<ApiResponse<ImportSummary>>, ApiError> {
    let inputs = parse_csv(&body)?;
    let summary = import_recipes(&state.db.pool, admin.user.id, inputs, IMPORT_ID_PREFIX).await;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// GET /api/admin/stats
pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<ResponseJson<ApiResponse<AdminStats>>, ApiError> {
    let pool = &state.db.pool;
    let stats = AdminStats {
        users: User::count(pool).await?,
        catalog_recipes: SavedRecipe::count_catalog(pool).await?,
        liked_swipes: SavedRecipe::count_swipes(pool, true).await?,
        dismissed_swipes: SavedRecipe::count_swipes(pool, false).await?,
        meal_plans: MealPlan::count(pool).await?,
    };
    Ok(ResponseJson(ApiResponse::success(stats)))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<ResponseJson<ApiResponse<Vec<UserInfo>>>, ApiError> {
    let users = User::find_all(&state.db.pool)
        .await?
        .iter()
        .map(User::to_info)
        .collect();
    Ok(ResponseJson(ApiResponse::success(users)))
}

/// PUT /api/admin/users/{id}/role
pub async fn update_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateRoleRequest>,
) -> Result<ResponseJson<ApiResponse<UserInfo>>, ApiError> {
    if id == admin.user.id && payload.role != UserRole::Admin {
        return Err(ApiError::BadRequest(
            "admins cannot remove their own admin role".to_string(),
        ));
    }
    let user = User::update_role(&state.db.pool, id, payload.role).await?;
    info!(user_id = %user.id, role = %user.role, "Changed user role");
    Ok(ResponseJson(ApiResponse::success(user.to_info())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/admin",
        Router::new()
            .route("/recipes", get(list_catalog).post(create_recipe))
            .route("/recipes/import/json", post(import_json))
            .route("/recipes/import/csv", post(import_csv))
            .route("/recipes/{id}", put(update_recipe).delete(delete_recipe))
            .route("/stats", get(stats))
            .route("/users", get(list_users))
            .route("/users/{id}/role", put(update_role)),
    )
}
