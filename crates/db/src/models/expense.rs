use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::category::CategoryTotal;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount: f64,
    pub description: Option<String>,
    pub spent_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpense {
    pub category_id: Option<Uuid>,
    pub amount: f64,
    pub description: Option<String>,
    pub spent_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpense {
    pub category_id: Option<Uuid>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub spent_on: Option<NaiveDate>,
}

impl Expense {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &CreateExpense,
        spent_on: NaiveDate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Expense>(
            r#"INSERT INTO expenses (id, user_id, category_id, amount, description, spent_on)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(data.category_id)
        .bind(data.amount)
        .bind(&data.description)
        .bind(spent_on)
        .fetch_one(pool)
        .await
    }

    /// `range` is a half-open `[from, to)` date window.
    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: Uuid,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let (from, to) = range.unzip();
        sqlx::query_as::<_, Expense>(
            r#"SELECT * FROM expenses
               WHERE user_id = $1
                 AND ($2 IS NULL OR spent_on >= $2)
                 AND ($3 IS NULL OR spent_on < $3)
               ORDER BY spent_on DESC, created_at DESC"#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        data: &UpdateExpense,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Expense>(
            r#"UPDATE expenses SET
                   category_id = COALESCE($1, category_id),
                   amount = COALESCE($2, amount),
                   description = COALESCE($3, description),
                   spent_on = COALESCE($4, spent_on),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $5 AND user_id = $6
               RETURNING *"#,
        )
        .bind(data.category_id)
        .bind(data.amount)
        .bind(&data.description)
        .bind(data.spent_on)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete_for_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn total(
        pool: &SqlitePool,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>(
            r#"SELECT COALESCE(SUM(amount), 0.0) FROM expenses
               WHERE user_id = $1 AND spent_on >= $2 AND spent_on < $3"#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await
    }

    pub async fn totals_by_category(
        pool: &SqlitePool,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CategoryTotal>, sqlx::Error> {
        sqlx::query_as::<_, CategoryTotal>(
            r#"SELECT
                   e.category_id AS category_id,
                   c.name AS category_name,
                   COALESCE(SUM(e.amount), 0.0) AS total
               FROM expenses e
               LEFT JOIN categories c ON c.id = e.category_id
               WHERE e.user_id = $1 AND e.spent_on >= $2 AND e.spent_on < $3
               GROUP BY e.category_id, c.name
               ORDER BY total DESC"#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::{
            category::{Category, CategoryKind, CreateCategory},
            user::{CreateUser, User, UserRole},
        },
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn totals_group_by_category_within_range() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = User::create(
            &db.pool,
            &CreateUser {
                email: "money@example.com".to_string(),
                name: None,
                role: UserRole::User,
            },
            "hash",
        )
        .await
        .unwrap();
        let food = Category::create(
            &db.pool,
            user.id,
            &CreateCategory {
                name: "食費".to_string(),
                kind: Some(CategoryKind::Expense),
                color: None,
            },
        )
        .await
        .unwrap();

        for (amount, d, category) in [(1200.0, 1, Some(food.id)), (800.0, 20, Some(food.id)), (500.0, 5, None)] {
            let data = CreateExpense {
                category_id: category,
                amount,
                description: None,
                spent_on: None,
            };
            Expense::create(&db.pool, user.id, &data, day(d)).await.unwrap();
        }

        let total = Expense::total(&db.pool, user.id, day(1), day(15)).await.unwrap();
        assert_eq!(total, 1700.0);

        let by_category = Expense::totals_by_category(&db.pool, user.id, day(1), day(31))
            .await
            .unwrap();
        assert_eq!(by_category.len(), 2);
        assert_eq!(by_category[0].category_name.as_deref(), Some("食費"));
        assert_eq!(by_category[0].total, 2000.0);

        let in_range = Expense::find_by_user(&db.pool, user.id, Some((day(1), day(10))))
            .await
            .unwrap();
        assert_eq!(in_range.len(), 2);
    }
}
