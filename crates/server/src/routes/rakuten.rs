use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::saved_recipe::RecipeData;
use serde::{Deserialize, Serialize};
use services::services::{
    rakuten_api::{DataSource, RakutenCategory, RakutenDiagnostics, RakutenListing},
    recipe_import::{IMPORT_ID_PREFIX, ImportSummary, RecipeInput, import_recipes},
};
use tracing::info;
use ts_rs::TS;
use utils::{response::ApiResponse, text::non_blank};

use crate::{AppState, error::ApiError, middleware::auth::AdminUser};

const DEFAULT_SEARCH_LIMIT: usize = 12;
const MAX_SEARCH_LIMIT: usize = 50;

fn search_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingQuery {
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RakutenImportRequest {
    pub category_id: Option<String>,
    pub keyword: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RakutenImportResponse {
    pub source: DataSource,
    pub warning: Option<String>,
    #[serde(flatten)]
    pub summary: ImportSummary,
}

/// GET /api/admin/rakuten/categories
pub async fn categories(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ResponseJson<ApiResponse<RakutenListing<RakutenCategory>>> {
    ResponseJson(ApiResponse::success(state.rakuten.categories().await))
}

/// GET /api/admin/rakuten/ranking?categoryId=
pub async fn ranking(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<RankingQuery>,
) -> ResponseJson<ApiResponse<RakutenListing<RecipeData>>> {
    let category_id = non_blank(query.category_id.as_deref());
    ResponseJson(ApiResponse::success(state.rakuten.ranking(category_id).await))
}

/// GET /api/admin/rakuten/search?keyword=&limit=
pub async fn search(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<SearchQuery>,
) -> Result<ResponseJson<ApiResponse<RakutenListing<RecipeData>>>, ApiError> {
    let keyword = non_blank(query.keyword.as_deref())
        .ok_or_else(|| ApiError::BadRequest("keyword is required".to_string()))?;
    let listing = state
        .rakuten
        .search(keyword, search_limit(query.limit))
        .await;
    Ok(ResponseJson(ApiResponse::success(listing)))
}

/// POST /api/admin/rakuten/import
/// Imports search results when a keyword is given, else the category ranking.
pub async fn import(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    axum::Json(payload): axum::Json<RakutenImportRequest>,
) -> Result<ResponseJson<ApiResponse<RakutenImportResponse>>, ApiError> {
    let limit = search_limit(payload.limit);
    let listing = match non_blank(payload.keyword.as_deref()) {
        Some(keyword) => state.rakuten.search(keyword, limit).await,
        None => {
            let mut listing = state
                .rakuten
                .ranking(non_blank(payload.category_id.as_deref()))
                .await;
            listing.items.truncate(limit);
            listing
        }
    };

    let inputs = listing.items.into_iter().map(RecipeInput::from).collect();
    let summary = import_recipes(&state.db.pool, admin.user.id, inputs, IMPORT_ID_PREFIX).await;
    info!(
        source = ?listing.source,
        imported = summary.imported,
        "Imported Rakuten recipes"
    );

    Ok(ResponseJson(ApiResponse::success(RakutenImportResponse {
        source: listing.source,
        warning: listing.warning,
        summary,
    })))
}

/// GET /api/admin/rakuten/diagnostics
pub async fn diagnostics(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ResponseJson<ApiResponse<RakutenDiagnostics>> {
    ResponseJson(ApiResponse::success(state.rakuten.diagnostics().await))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/admin/rakuten",
        Router::new()
            .route("/categories", get(categories))
            .route("/ranking", get(ranking))
            .route("/search", get(search))
            .route("/import", post(import))
            .route("/diagnostics", get(diagnostics)),
    )
}
