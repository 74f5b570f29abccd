pub mod category;
pub mod expense;
pub mod income;
pub mod meal_plan;
pub mod saved_recipe;
pub mod session;
pub mod user;
