//! Writes the TypeScript declarations of the API types to `shared/types.ts`.

use std::{fs, path::PathBuf};

use ts_rs::TS;

fn main() -> anyhow::Result<()> {
    let decls = [
        utils::response::ApiResponse::<()>::decl(),
        db::models::user::UserRole::decl(),
        db::models::user::UserInfo::decl(),
        db::models::saved_recipe::SavedRecipe::decl(),
        db::models::saved_recipe::RecipeData::decl(),
        db::models::meal_plan::MealPlan::decl(),
        db::models::meal_plan::MealPlanRecipe::decl(),
        db::models::meal_plan::MealPlanEntry::decl(),
        db::models::category::CategoryKind::decl(),
        db::models::category::Category::decl(),
        db::models::category::CreateCategory::decl(),
        db::models::category::UpdateCategory::decl(),
        db::models::category::CategoryTotal::decl(),
        db::models::expense::Expense::decl(),
        db::models::expense::CreateExpense::decl(),
        db::models::expense::UpdateExpense::decl(),
        db::models::income::Income::decl(),
        db::models::income::CreateIncome::decl(),
        db::models::income::UpdateIncome::decl(),
        services::services::meal_planner::MealPlanView::decl(),
        services::services::meal_planner::Assignment::decl(),
        services::services::meal_planner::MoveResult::decl(),
        services::services::ingredients::IngredientCategory::decl(),
        services::services::ingredients::ParsedIngredient::decl(),
        services::services::shopping_list::ShoppingListItem::decl(),
        services::services::shopping_list::ShoppingListGroup::decl(),
        services::services::shopping_list::ShoppingList::decl(),
        services::services::recipe_import::RecipeInput::decl(),
        services::services::recipe_import::ImportSummary::decl(),
        services::services::rakuten_api::DataSource::decl(),
        services::services::rakuten_api::CategoryLevel::decl(),
        services::services::rakuten_api::RakutenCategory::decl(),
        services::services::rakuten_api::RakutenListing::<()>::decl(),
        services::services::rakuten_api::ProbeResult::decl(),
        services::services::rakuten_api::RakutenDiagnostics::decl(),
        services::services::database_validator::ValidationResult::decl(),
        server::routes::health::HealthStatus::decl(),
        server::routes::auth::RegisterRequest::decl(),
        server::routes::auth::LoginRequest::decl(),
        server::routes::auth::ChangePasswordRequest::decl(),
        server::routes::auth::LogoutResponse::decl(),
        server::routes::saved_recipes::SaveRecipeRequest::decl(),
        server::routes::saved_recipes::SaveRecipeResponse::decl(),
        server::routes::saved_recipes::DeletedCount::decl(),
        server::routes::meal_plans::MoveRequest::decl(),
        server::routes::meal_plans::AssignRequest::decl(),
        server::routes::shopping_list::ShoppingListResponse::decl(),
        server::routes::users::UpdateProfileRequest::decl(),
        server::routes::admin::AdminStats::decl(),
        server::routes::admin::UpdateRoleRequest::decl(),
        server::routes::rakuten::RakutenImportRequest::decl(),
        server::routes::rakuten::RakutenImportResponse::decl(),
        server::routes::finance::FinanceSummary::decl(),
    ];

    let mut output = String::from(
        "// This file was generated by `cargo run --bin generate_types`. Do not edit.\n\n",
    );
    for decl in decls {
        output.push_str("export ");
        output.push_str(&decl);
        output.push_str("\n\n");
    }

    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, output)?;
    println!("Wrote {}", path.display());
    Ok(())
}
