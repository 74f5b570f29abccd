use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::is_unique_violation;
use services::services::{
    auth::AuthError, database_validator::DatabaseValidationError, meal_planner::MealPlanError,
    recipe_import::RecipeImportError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    MealPlan(#[from] MealPlanError),
    #[error(transparent)]
    RecipeImport(#[from] RecipeImportError),
    #[error(transparent)]
    DatabaseValidation(#[from] DatabaseValidationError),
    #[error("{0}")]
    BadRequest(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("admin access required")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

fn database_status(err: &sqlx::Error) -> StatusCode {
    match err {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        e if is_unique_violation(e) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(e) => database_status(e),
            Self::Auth(e) => match e {
                AuthError::Database(e) => database_status(e),
                AuthError::InvalidEmail | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
                AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::InvalidCredentials | AuthError::InvalidSession => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::Hash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::MealPlan(e) => match e {
                MealPlanError::Database(e) => database_status(e),
                MealPlanError::InvalidDay(_) | MealPlanError::RecipeNotLiked => {
                    StatusCode::BAD_REQUEST
                }
                MealPlanError::EntryNotFound | MealPlanError::RecipeNotFound => {
                    StatusCode::NOT_FOUND
                }
            },
            Self::RecipeImport(e) => match e {
                RecipeImportError::Database(e) => database_status(e),
                _ => StatusCode::BAD_REQUEST,
            },
            Self::DatabaseValidation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Request failed: {}", self);
                "internal server error".to_string()
            }
            StatusCode::NOT_FOUND if matches!(self, Self::Database(_)) => {
                "resource not found".to_string()
            }
            StatusCode::CONFLICT if matches!(self, Self::Database(_)) => {
                "resource already exists".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_service_errors_to_status_codes() {
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AuthError::EmailTaken).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidSession).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(MealPlanError::InvalidDay(7)).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RecipeImportError::MissingField("title")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(sqlx::Error::PoolClosed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
