use axum::{
    Router,
    http::{
        Method,
        header::{ACCEPT, CONTENT_TYPE},
    },
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

pub mod admin;
pub mod auth;
pub mod finance;
pub mod health;
pub mod meal_plans;
pub mod rakuten;
pub mod recipes;
pub mod saved_recipes;
pub mod shopping_list;
pub mod users;

/// Default page size for list endpoints that take `limit`.
pub(crate) const DEFAULT_LIMIT: i64 = 20;
pub(crate) const MAX_LIMIT: i64 = 100;

pub(crate) fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(health::router(&state))
        .merge(auth::router(&state))
        .merge(recipes::router(&state))
        .merge(saved_recipes::router(&state))
        .merge(meal_plans::router(&state))
        .merge(shopping_list::router(&state))
        .merge(users::router(&state))
        .merge(admin::router(&state))
        .merge(rakuten::router(&state))
        .merge(finance::router(&state));

    // Cookies ride on cross-origin requests from the dev client, so origins are mirrored.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
