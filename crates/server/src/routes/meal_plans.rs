use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use serde::Deserialize;
use services::services::meal_planner::{
    Assignment, MealPlanView, MoveResult, current_week_start, week_start_for,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::auth::CurrentUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    pub week_start: Option<NaiveDate>,
}

impl WeekQuery {
    /// Any date inside a week selects that week.
    pub fn resolve(&self) -> NaiveDate {
        self.week_start
            .map(week_start_for)
            .unwrap_or_else(current_week_start)
    }
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub entry_id: Uuid,
    pub target_day: i64,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub saved_recipe_id: Uuid,
    pub day_of_week: Option<i64>,
    pub week_start: Option<NaiveDate>,
}

/// GET /api/meal-plans/current
pub async fn current_plan(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> Result<ResponseJson<ApiResponse<MealPlanView>>, ApiError> {
    let view = state
        .planner
        .plan_for_week(auth.user.id, current_week_start())
        .await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

/// GET /api/meal-plans?weekStart=YYYY-MM-DD
pub async fn plan_for_week(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Query(query): Query<WeekQuery>,
) -> Result<ResponseJson<ApiResponse<MealPlanView>>, ApiError> {
    let view = state
        .planner
        .plan_for_week(auth.user.id, query.resolve())
        .await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

/// PUT /api/meal-plans/move
/// Dropping onto an occupied day swaps the two recipes.
pub async fn move_entry(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    axum::Json(payload): axum::Json<MoveRequest>,
) -> Result<ResponseJson<ApiResponse<MoveResult>>, ApiError> {
    let result = state
        .planner
        .move_entry(auth.user.id, payload.entry_id, payload.target_day)
        .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

/// POST /api/meal-plans/assign
pub async fn assign(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    axum::Json(payload): axum::Json<AssignRequest>,
) -> Result<ResponseJson<ApiResponse<Assignment>>, ApiError> {
    let week_start = payload
        .week_start
        .map(week_start_for)
        .unwrap_or_else(current_week_start);
    let assignment = state
        .planner
        .assign(
            auth.user.id,
            payload.saved_recipe_id,
            payload.day_of_week,
            week_start,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(assignment)))
}

/// DELETE /api/meal-plans/entries/{id}
pub async fn remove_entry(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.planner.remove_entry(auth.user.id, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/meal-plans",
        Router::new()
            .route("/", get(plan_for_week))
            .route("/current", get(current_plan))
            .route("/move", put(move_entry))
            .route("/assign", post(assign))
            .route("/entries/{id}", delete(remove_entry)),
    )
}
