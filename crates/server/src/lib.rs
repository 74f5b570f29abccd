use std::sync::Arc;

use db::DBService;
use services::services::{
    auth::AuthService,
    meal_planner::MealPlanner,
    rakuten_api::{RakutenApiError, RakutenClient},
};

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

use config::Config;

/// Shared handles passed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub config: Arc<Config>,
    pub auth: AuthService,
    pub planner: MealPlanner,
    pub rakuten: RakutenClient,
}

impl AppState {
    pub fn new(db: DBService, config: Config) -> Result<Self, RakutenApiError> {
        let rakuten = RakutenClient::new(config.rakuten_application_id.clone(), None)?;
        Ok(Self {
            auth: AuthService::new(db.pool.clone(), config.session_ttl()),
            planner: MealPlanner::new(db.pool.clone()),
            rakuten,
            config: Arc::new(config),
            db,
        })
    }
}

pub use routes::router;
