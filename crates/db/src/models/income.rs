use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Income {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount: f64,
    pub source: Option<String>,
    pub received_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncome {
    pub category_id: Option<Uuid>,
    pub amount: f64,
    pub source: Option<String>,
    pub received_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIncome {
    pub category_id: Option<Uuid>,
    pub amount: Option<f64>,
    pub source: Option<String>,
    pub received_on: Option<NaiveDate>,
}

impl Income {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &CreateIncome,
        received_on: NaiveDate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Income>(
            r#"INSERT INTO incomes (id, user_id, category_id, amount, source, received_on)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(data.category_id)
        .bind(data.amount)
        .bind(&data.source)
        .bind(received_on)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: Uuid,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let (from, to) = range.unzip();
        sqlx::query_as::<_, Income>(
            r#"SELECT * FROM incomes
               WHERE user_id = $1
                 AND ($2 IS NULL OR received_on >= $2)
                 AND ($3 IS NULL OR received_on < $3)
               ORDER BY received_on DESC, created_at DESC"#,
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
        sqlx::query_as::<_, Income>("SELECT * FROM incomes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        data: &UpdateIncome,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Income>(
            r#"UPDATE incomes SET
                   category_id = COALESCE($1, category_id),
                   amount = COALESCE($2, amount),
                   source = COALESCE($3, source),
                   received_on = COALESCE($4, received_on),
                   updated_at = datetime('now', 'subsec')
               WHERE id = $5 AND user_id = $6
               RETURNING *"#,
        )
        .bind(data.category_id)
        .bind(data.amount)
        .bind(&data.source)
        .bind(data.received_on)
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
        let result = sqlx::query("DELETE FROM incomes WHERE id = $1 AND user_id = $2")
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
            r#"SELECT COALESCE(SUM(amount), 0.0) FROM incomes
               WHERE user_id = $1 AND received_on >= $2 AND received_on < $3"#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await
    }
}
