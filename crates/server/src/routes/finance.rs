//! Personal finance bookkeeping: categories, expenses and incomes per user.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::{Datelike, Local, Months, NaiveDate};
use db::models::{
    category::{Category, CategoryKind, CategoryTotal, CreateCategory, UpdateCategory},
    expense::{CreateExpense, Expense, UpdateExpense},
    income::{CreateIncome, Income, UpdateIncome},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use ts_rs::TS;
use utils::{response::ApiResponse, text::non_blank};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::auth::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub kind: Option<CategoryKind>,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    /// `YYYY-MM`
    pub month: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub month: String,
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub expenses_by_category: Vec<CategoryTotal>,
}

/// Half-open date range covering the month `YYYY-MM`.
pub fn month_range(month: &str) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let invalid = || ApiError::BadRequest(format!("invalid month {month:?}, expected YYYY-MM"));
    let start = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| invalid())?;
    let end = start.checked_add_months(Months::new(1)).ok_or_else(invalid)?;
    Ok((start, end))
}

fn validate_amount(amount: f64) -> Result<(), ApiError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::BadRequest(
            "amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_own_category(
    pool: &SqlitePool,
    category_id: Option<Uuid>,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let Some(id) = category_id else {
        return Ok(());
    };
    if Category::find_for_user(pool, id, user_id).await?.is_none() {
        return Err(ApiError::BadRequest("category not found".to_string()));
    }
    Ok(())
}

fn month_filter(query: &MonthQuery) -> Result<Option<(NaiveDate, NaiveDate)>, ApiError> {
    non_blank(query.month.as_deref()).map(month_range).transpose()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// GET /api/categories?kind=
pub async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Query(query): Query<CategoryQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Category>>>, ApiError> {
    let categories = Category::find_by_user(&state.db.pool, auth.user.id, query.kind).await?;
    Ok(ResponseJson(ApiResponse::success(categories)))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    axum::Json(payload): axum::Json<CreateCategory>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Category>>), ApiError> {
    if non_blank(Some(payload.name.as_str())).is_none() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    let category = Category::create(&state.db.pool, auth.user.id, &payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(category))))
}

/// PUT /api/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateCategory>,
) -> Result<ResponseJson<ApiResponse<Category>>, ApiError> {
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::BadRequest("name cannot be blank".to_string()));
    }
    let category = Category::update(&state.db.pool, id, auth.user.id, &payload)
        .await?
        .ok_or(ApiError::NotFound("category"))?;
    Ok(ResponseJson(ApiResponse::success(category)))
}

/// DELETE /api/categories/{id}
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Category::delete_for_user(&state.db.pool, id, auth.user.id).await? == 0 {
        return Err(ApiError::NotFound("category"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/expenses?month=YYYY-MM
pub async fn list_expenses(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Query(query): Query<MonthQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Expense>>>, ApiError> {
    let expenses =
        Expense::find_by_user(&state.db.pool, auth.user.id, month_filter(&query)?).await?;
    Ok(ResponseJson(ApiResponse::success(expenses)))
}

/// POST /api/expenses
/// `spentOn` defaults to today.
pub async fn create_expense(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    axum::Json(payload): axum::Json<CreateExpense>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Expense>>), ApiError> {
    validate_amount(payload.amount)?;
    ensure_own_category(&state.db.pool, payload.category_id, auth.user.id).await?;
    let spent_on = payload.spent_on.unwrap_or_else(today);
    let expense = Expense::create(&state.db.pool, auth.user.id, &payload, spent_on).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(expense))))
}

/// PUT /api/expenses/{id}
pub async fn update_expense(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateExpense>,
) -> Result<ResponseJson<ApiResponse<Expense>>, ApiError> {
    if let Some(amount) = payload.amount {
        validate_amount(amount)?;
    }
    ensure_own_category(&state.db.pool, payload.category_id, auth.user.id).await?;
    let expense = Expense::update(&state.db.pool, id, auth.user.id, &payload)
        .await?
        .ok_or(ApiError::NotFound("expense"))?;
    Ok(ResponseJson(ApiResponse::success(expense)))
}

/// DELETE /api/expenses/{id}
pub async fn delete_expense(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Expense::delete_for_user(&state.db.pool, id, auth.user.id).await? == 0 {
        return Err(ApiError::NotFound("expense"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/incomes?month=YYYY-MM
pub async fn list_incomes(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Query(query): Query<MonthQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Income>>>, ApiError> {
    let incomes = Income::find_by_user(&state.db.pool, auth.user.id, month_filter(&query)?).await?;
    Ok(ResponseJson(ApiResponse::success(incomes)))
}

/// POST /api/incomes
/// `receivedOn` defaults to today.
pub async fn create_income(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    axum::Json(payload): axum::Json<CreateIncome>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Income>>), ApiError> {
    validate_amount(payload.amount)?;
    ensure_own_category(&state.db.pool, payload.category_id, auth.user.id).await?;
    let received_on = payload.received_on.unwrap_or_else(today);
    let income = Income::create(&state.db.pool, auth.user.id, &payload, received_on).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(income))))
}

/// PUT /api/incomes/{id}
pub async fn update_income(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateIncome>,
) -> Result<ResponseJson<ApiResponse<Income>>, ApiError> {
    if let Some(amount) = payload.amount {
        validate_amount(amount)?;
    }
    ensure_own_category(&state.db.pool, payload.category_id, auth.user.id).await?;
    let income = Income::update(&state.db.pool, id, auth.user.id, &payload)
        .await?
        .ok_or(ApiError::NotFound("income"))?;
    Ok(ResponseJson(ApiResponse::success(income)))
}

/// DELETE /api/incomes/{id}
pub async fn delete_income(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Income::delete_for_user(&state.db.pool, id, auth.user.id).await? == 0 {
        return Err(ApiError::NotFound("income"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/finance/summary?month=YYYY-MM
/// Defaults to the current month.
pub async fn summary(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Query(query): Query<MonthQuery>,
) -> Result<ResponseJson<ApiResponse<FinanceSummary>>, ApiError> {
    let (from, to) = match month_filter(&query)? {
        Some(range) => range,
        None => {
            let now = today();
            month_range(&format!("{:04}-{:02}", now.year(), now.month()))?
        }
    };

    let pool = &state.db.pool;
    let total_income = Income::total(pool, auth.user.id, from, to).await?;
    let total_expense = Expense::total(pool, auth.user.id, from, to).await?;
    let expenses_by_category = Expense::totals_by_category(pool, auth.user.id, from, to).await?;

    Ok(ResponseJson(ApiResponse::success(FinanceSummary {
        month: from.format("%Y-%m").to_string(),
        total_income,
        total_expense,
        balance: total_income - total_expense,
        expenses_by_category,
    })))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{id}", put(update_category).delete(delete_category))
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/{id}", put(update_expense).delete(delete_expense))
        .route("/incomes", get(list_incomes).post(create_income))
        .route("/incomes/{id}", put(update_income).delete(delete_income))
        .route("/finance/summary", get(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_ranges() {
        let (from, to) = month_range("2026-12").unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());

        assert!(month_range("2026-13").is_err());
        assert!(month_range("december").is_err());
    }

    #[test]
    fn amounts_must_be_finite_and_non_negative() {
        assert!(validate_amount(0.0).is_ok());
        assert!(validate_amount(1200.5).is_ok());
        assert!(validate_amount(-1.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
    }
}
