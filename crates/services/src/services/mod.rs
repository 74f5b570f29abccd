pub mod auth;
pub mod database_validator;
pub mod ingredients;
pub mod meal_planner;
pub mod rakuten_api;
pub mod recipe_import;
pub mod session_sweeper;
pub mod shopping_list;
