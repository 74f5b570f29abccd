use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "category_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CategoryKind {
    #[default]
    Expense,
    Income,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    pub name: String,
    pub kind: Option<CategoryKind>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Category {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &CreateCategory,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (id, user_id, name, kind, color)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(data.name.trim())
        .bind(data.kind.unwrap_or_default())
        .bind(&data.color)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: Uuid,
        kind: Option<CategoryKind>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"SELECT * FROM categories
               WHERE user_id = $1 AND ($2 IS NULL OR kind = $2)
               ORDER BY kind ASC, name ASC"#,
        )
        .bind(user_id)
        .bind(kind)
        .fetch_all(pool)
        .await
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        data: &UpdateCategory,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"UPDATE categories SET
                   name = COALESCE($1, name),
                   color = COALESCE($2, color),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $3 AND user_id = $4
               RETURNING *"#,
        )
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.color)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Expenses and incomes pointing at the category keep their rows with a NULL category.
    pub async fn delete_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Per-category total used by the monthly summary.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub total: f64,
}
