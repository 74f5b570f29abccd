use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::saved_recipe::SavedRecipe;

/// The only meal type the planner fills today.
pub const DINNER: &str = "dinner";

/// A user's plan for the week starting at `week_start` (a Monday).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_start: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One slot of a plan: (day_of_week, meal_type) → saved recipe.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanRecipe {
    pub id: Uuid,
    pub meal_plan_id: Uuid,
    pub saved_recipe_id: Uuid,
    pub day_of_week: i64, // 1 = Monday
    pub meal_type: String,
    pub created_at: DateTime<Utc>,
}

/// A slot joined with its recipe, as the plan view shows it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanEntry {
    pub entry_id: Uuid,
    pub day_of_week: i64,
    pub meal_type: String,
    #[sqlx(flatten)]
    pub recipe: SavedRecipe,
}

impl MealPlan {
    pub async fn find_by_user_and_week(
        pool: &SqlitePool,
        user_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MealPlan>(
            "SELECT * FROM meal_plans WHERE user_id = $1 AND week_start = $2",
        )
        .bind(user_id)
        .bind(week_start)
        .fetch_optional(pool)
        .await
    }

    pub async fn get_or_create(
        pool: &SqlitePool,
        user_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO meal_plans (id, user_id, week_start)
               VALUES ($1, $2, $3)
               ON CONFLICT(user_id, week_start) DO NOTHING"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(week_start)
        .execute(pool)
        .await?;

        Self::find_by_user_and_week(pool, user_id, week_start)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn touch<'e, E>(executor: E, id: Uuid) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE meal_plans SET updated_at = datetime('now', 'subsec') WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM meal_plans")
            .fetch_one(pool)
            .await
    }
}

impl MealPlanRecipe {
    /// Entries of a plan with their recipes, ordered by day.
    pub async fn find_entries(
        pool: &SqlitePool,
        meal_plan_id: Uuid,
    ) -> Result<Vec<MealPlanEntry>, sqlx::Error> {
        sqlx::query_as::<_, MealPlanEntry>(
            r#"SELECT
                   mpr.id AS entry_id,
                   mpr.day_of_week,
                   mpr.meal_type,
                   r.*
               FROM meal_plan_recipes mpr
               JOIN saved_recipes r ON r.id = mpr.saved_recipe_id
               WHERE mpr.meal_plan_id = $1
               ORDER BY mpr.day_of_week ASC, mpr.meal_type ASC"#,
        )
        .bind(meal_plan_id)
        .fetch_all(pool)
        .await
    }

    /// Looks the entry up through its plan so users can only reach their own slots.
    pub async fn find_for_user<'e, E>(
        executor: E,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, MealPlanRecipe>(
            r#"SELECT mpr.* FROM meal_plan_recipes mpr
               JOIN meal_plans mp ON mp.id = mpr.meal_plan_id
               WHERE mpr.id = $1 AND mp.user_id = $2"#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_saved_recipe(
        pool: &SqlitePool,
        meal_plan_id: Uuid,
        saved_recipe_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MealPlanRecipe>(
            r#"SELECT * FROM meal_plan_recipes
               WHERE meal_plan_id = $1 AND saved_recipe_id = $2
               ORDER BY day_of_week ASC
               LIMIT 1"#,
        )
        .bind(meal_plan_id)
        .bind(saved_recipe_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_at_slot<'e, E>(
        executor: E,
        meal_plan_id: Uuid,
        day_of_week: i64,
        meal_type: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, MealPlanRecipe>(
            r#"SELECT * FROM meal_plan_recipes
               WHERE meal_plan_id = $1 AND day_of_week = $2 AND meal_type = $3"#,
        )
        .bind(meal_plan_id)
        .bind(day_of_week)
        .bind(meal_type)
        .fetch_optional(executor)
        .await
    }

    pub async fn occupied_days(
        pool: &SqlitePool,
        meal_plan_id: Uuid,
        meal_type: &str,
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT day_of_week FROM meal_plan_recipes
               WHERE meal_plan_id = $1 AND meal_type = $2
               ORDER BY day_of_week ASC"#,
        )
        .bind(meal_plan_id)
        .bind(meal_type)
        .fetch_all(pool)
        .await
    }

    /// Write a recipe into a slot, replacing whatever occupied it.
    pub async fn upsert_slot(
        pool: &SqlitePool,
        meal_plan_id: Uuid,
        saved_recipe_id: Uuid,
        day_of_week: i64,
        meal_type: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MealPlanRecipe>(
            r#"INSERT INTO meal_plan_recipes (id, meal_plan_id, saved_recipe_id, day_of_week, meal_type)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT(meal_plan_id, day_of_week, meal_type) DO UPDATE SET
                   id = excluded.id,
                   saved_recipe_id = excluded.saved_recipe_id,
                   created_at = excluded.created_at
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(meal_plan_id)
        .bind(saved_recipe_id)
        .bind(day_of_week)
        .bind(meal_type)
        .fetch_one(pool)
        .await
    }

    pub async fn set_day<'e, E>(executor: E, id: Uuid, day_of_week: i64) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE meal_plan_recipes SET day_of_week = $1 WHERE id = $2")
            .bind(day_of_week)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"DELETE FROM meal_plan_recipes
               WHERE id = $1
                 AND meal_plan_id IN (SELECT id FROM meal_plans WHERE user_id = $2)"#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_saved_recipe(
        pool: &SqlitePool,
        meal_plan_id: Uuid,
        saved_recipe_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM meal_plan_recipes WHERE meal_plan_id = $1 AND saved_recipe_id = $2",
        )
        .bind(meal_plan_id)
        .bind(saved_recipe_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        DBService,
        models::{
            saved_recipe::RecipeData,
            user::{CreateUser, User, UserRole},
        },
    };

    async fn seed(db: &DBService) -> (User, SavedRecipe, SavedRecipe) {
        let user = User::create(
            &db.pool,
            &CreateUser {
                email: "plan@example.com".to_string(),
                name: None,
                role: UserRole::User,
            },
            "hash",
        )
        .await
        .unwrap();
        let a = SavedRecipe::upsert(
            &db.pool,
            user.id,
            &RecipeData {
                recipe_id: "a".to_string(),
                title: "カレー".to_string(),
                ..Default::default()
            },
            true,
        )
        .await
        .unwrap();
        let b = SavedRecipe::upsert(
            &db.pool,
            user.id,
            &RecipeData {
                recipe_id: "b".to_string(),
                title: "肉じゃが".to_string(),
                ..Default::default()
            },
            true,
        )
        .await
        .unwrap();
        (user, a, b)
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let db = DBService::new_in_memory().await.unwrap();
        let (user, _, _) = seed(&db).await;
        let first = MealPlan::get_or_create(&db.pool, user.id, monday()).await.unwrap();
        let second = MealPlan::get_or_create(&db.pool, user.id, monday()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.week_start, monday());
        assert_eq!(MealPlan::count(&db.pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_slot_replaces_occupant() {
        let db = DBService::new_in_memory().await.unwrap();
        let (user, a, b) = seed(&db).await;
        let plan = MealPlan::get_or_create(&db.pool, user.id, monday()).await.unwrap();

        MealPlanRecipe::upsert_slot(&db.pool, plan.id, a.id, 1, DINNER).await.unwrap();
        MealPlanRecipe::upsert_slot(&db.pool, plan.id, b.id, 1, DINNER).await.unwrap();

        let entries = MealPlanRecipe::find_entries(&db.pool, plan.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].recipe.id, b.id);
        assert_eq!(entries[0].day_of_week, 1);
    }

    #[tokio::test]
    async fn entries_are_ordered_by_day_and_cascade_with_recipe() {
        let db = DBService::new_in_memory().await.unwrap();
        let (user, a, b) = seed(&db).await;
        let plan = MealPlan::get_or_create(&db.pool, user.id, monday()).await.unwrap();

        MealPlanRecipe::upsert_slot(&db.pool, plan.id, a.id, 4, DINNER).await.unwrap();
        MealPlanRecipe::upsert_slot(&db.pool, plan.id, b.id, 2, DINNER).await.unwrap();

        let days = MealPlanRecipe::occupied_days(&db.pool, plan.id, DINNER).await.unwrap();
        assert_eq!(days, vec![2, 4]);

        let entries = MealPlanRecipe::find_entries(&db.pool, plan.id).await.unwrap();
        assert_eq!(entries[0].recipe.title, "肉じゃが");

        SavedRecipe::delete_for_user(&db.pool, b.id, user.id).await.unwrap();
        let days = MealPlanRecipe::occupied_days(&db.pool, plan.id, DINNER).await.unwrap();
        assert_eq!(days, vec![4]);
    }

    #[tokio::test]
    async fn find_for_user_hides_other_users_entries() {
        let db = DBService::new_in_memory().await.unwrap();
        let (user, a, _) = seed(&db).await;
        let plan = MealPlan::get_or_create(&db.pool, user.id, monday()).await.unwrap();
        let entry = MealPlanRecipe::upsert_slot(&db.pool, plan.id, a.id, 3, DINNER)
            .await
            .unwrap();

        assert!(MealPlanRecipe::find_for_user(&db.pool, entry.id, user.id).await.unwrap().is_some());
        assert!(
            MealPlanRecipe::find_for_user(&db.pool, entry.id, Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }
}
