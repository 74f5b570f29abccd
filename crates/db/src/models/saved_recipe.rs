use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// A recipe row owned by a user, liked or dismissed. Rows owned by an admin
/// account double as the shared catalog.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipe_id: String, // external id, unique per user
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub indication: Option<String>, // cooking time, e.g. "約30分"
    #[sqlx(json)]
    pub materials: Vec<String>,
    pub instructions: Option<String>,
    pub recipe_url: Option<String>,
    pub shop_name: Option<String>,
    pub liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recipe payload shared by swipes, admin CRUD and imports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RecipeData {
    pub recipe_id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub indication: Option<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    pub instructions: Option<String>,
    pub recipe_url: Option<String>,
    pub shop_name: Option<String>,
}

impl SavedRecipe {
    pub fn to_data(&self) -> RecipeData {
        RecipeData {
            recipe_id: self.recipe_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            indication: self.indication.clone(),
            materials: self.materials.clone(),
            instructions: self.instructions.clone(),
            recipe_url: self.recipe_url.clone(),
            shop_name: self.shop_name.clone(),
        }
    }

    /// Insert, or on a repeated (user_id, recipe_id) refresh the recipe fields and the liked flag.
    pub async fn upsert(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &RecipeData,
        liked: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SavedRecipe>(
            r#"INSERT INTO saved_recipes
                   (id, user_id, recipe_id, title, description, image_url, indication,
                    materials, instructions, recipe_url, shop_name, liked)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               ON CONFLICT(user_id, recipe_id) DO UPDATE SET
                   title = excluded.title,
                   description = excluded.description,
                   image_url = excluded.image_url,
                   indication = excluded.indication,
                   materials = excluded.materials,
                   instructions = excluded.instructions,
                   recipe_url = excluded.recipe_url,
                   shop_name = excluded.shop_name,
                   liked = excluded.liked,
                   updated_at = datetime('now', 'subsec')
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&data.recipe_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.image_url)
        .bind(&data.indication)
        .bind(Json(&data.materials))
        .bind(&data.instructions)
        .bind(&data.recipe_url)
        .bind(&data.shop_name)
        .bind(liked)
        .fetch_one(pool)
        .await
    }

    /// Plain insert; a repeated (user_id, recipe_id) surfaces as a unique violation.
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &RecipeData,
        liked: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SavedRecipe>(
            r#"INSERT INTO saved_recipes
                   (id, user_id, recipe_id, title, description, image_url, indication,
                    materials, instructions, recipe_url, shop_name, liked)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&data.recipe_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.image_url)
        .bind(&data.indication)
        .bind(Json(&data.materials))
        .bind(&data.instructions)
        .bind(&data.recipe_url)
        .bind(&data.shop_name)
        .bind(liked)
        .fetch_one(pool)
        .await
    }

    /// Overwrites the content fields; `recipe_id` is left alone.
    pub async fn update_content(
        pool: &SqlitePool,
        id: Uuid,
        data: &RecipeData,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedRecipe>(
            r#"UPDATE saved_recipes SET
                   title = $1,
                   description = $2,
                   image_url = $3,
                   indication = $4,
                   materials = $5,
                   instructions = $6,
                   recipe_url = $7,
                   shop_name = $8,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $9
               RETURNING *"#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.image_url)
        .bind(&data.indication)
        .bind(Json(&data.materials))
        .bind(&data.instructions)
        .bind(&data.recipe_url)
        .bind(&data.shop_name)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedRecipe>("SELECT * FROM saved_recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedRecipe>(
            "SELECT * FROM saved_recipes WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_recipe_id(
        pool: &SqlitePool,
        user_id: Uuid,
        recipe_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedRecipe>(
            "SELECT * FROM saved_recipes WHERE user_id = $1 AND recipe_id = $2",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(pool)
        .await
    }

    /// `liked = None` returns both liked and dismissed rows.
    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: Uuid,
        liked: Option<bool>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedRecipe>(
            r#"SELECT * FROM saved_recipes
               WHERE user_id = $1 AND ($2 IS NULL OR liked = $2)
               ORDER BY updated_at DESC"#,
        )
        .bind(user_id)
        .bind(liked)
        .fetch_all(pool)
        .await
    }

    pub async fn delete_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM saved_recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_dismissed(pool: &SqlitePool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM saved_recipes WHERE user_id = $1 AND liked = 0")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_catalog(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedRecipe>(
            r#"SELECT r.* FROM saved_recipes r
               JOIN users u ON u.id = r.user_id
               WHERE u.role = 'admin'
               ORDER BY r.created_at DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_catalog_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedRecipe>(
            r#"SELECT r.* FROM saved_recipes r
               JOIN users u ON u.id = r.user_id
               WHERE u.role = 'admin' AND r.id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Catalog recipes the user has not swiped on yet, newest first.
    pub async fn find_unseen_catalog(
        pool: &SqlitePool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SavedRecipe>(
            r#"SELECT r.* FROM saved_recipes r
               JOIN users u ON u.id = r.user_id
               WHERE u.role = 'admin'
                 AND r.user_id <> $1
                 AND r.recipe_id NOT IN (
                     SELECT s.recipe_id FROM saved_recipes s WHERE s.user_id = $2
                 )
               ORDER BY r.created_at DESC
               LIMIT $3"#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn catalog_contains(pool: &SqlitePool, recipe_id: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM saved_recipes r
               JOIN users u ON u.id = r.user_id
               WHERE u.role = 'admin' AND r.recipe_id = $1"#,
        )
        .bind(recipe_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn count_catalog(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM saved_recipes r
               JOIN users u ON u.id = r.user_id
               WHERE u.role = 'admin'"#,
        )
        .fetch_one(pool)
        .await
    }

    /// Swipes by regular users only; the catalog itself is excluded.
    pub async fn count_swipes(pool: &SqlitePool, liked: bool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM saved_recipes r
               JOIN users u ON u.id = r.user_id
               WHERE u.role = 'user' AND r.liked = $1"#,
        )
        .bind(liked)
        .fetch_one(pool)
        .await
    }
}
