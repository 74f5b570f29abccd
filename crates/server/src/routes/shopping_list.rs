use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use chrono::NaiveDate;
use serde::Serialize;
use services::services::shopping_list::{ShoppingList, generate_shopping_list};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::meal_plans::WeekQuery;
use crate::{AppState, error::ApiError, middleware::auth::CurrentUser};

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListResponse {
    pub meal_plan_id: Uuid,
    pub week_start: NaiveDate,
    #[serde(flatten)]
    pub list: ShoppingList,
}

/// GET /api/shopping-list?weekStart=
pub async fn get_shopping_list(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Query(query): Query<WeekQuery>,
) -> Result<ResponseJson<ApiResponse<ShoppingListResponse>>, ApiError> {
    let view = state
        .planner
        .plan_for_week(auth.user.id, query.resolve())
        .await?;

    let list = generate_shopping_list(
        view.entries
            .iter()
            .map(|entry| (entry.recipe.title.as_str(), entry.recipe.materials.as_slice())),
    );

    Ok(ResponseJson(ApiResponse::success(ShoppingListResponse {
        meal_plan_id: view.plan.id,
        week_start: view.plan.week_start,
        list,
    })))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/shopping-list", get(get_shopping_list))
}
