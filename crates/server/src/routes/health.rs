use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use serde::Serialize;
use services::services::database_validator::{DatabaseValidator, ValidationResult};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub database: ValidationResult,
}

/// GET /api/health
pub async fn health(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<HealthStatus>>, ApiError> {
    let database = DatabaseValidator::new(state.db.pool.clone())
        .validate()
        .await?;
    let status = if database.is_ok() { "ok" } else { "degraded" };

    Ok(ResponseJson(ApiResponse::success(HealthStatus {
        status: status.to_string(),
        database,
    })))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/health", get(health))
}
