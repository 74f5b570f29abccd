use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// Server-side half of a login. The token is mirrored in the session cookie.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"INSERT INTO sessions (id, token, user_id, expires_at)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_by_token(pool: &SqlitePool, token: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Log the user out everywhere except the session identified by `keep_token`.
    pub async fn delete_for_user_except(
        pool: &SqlitePool,
        user_id: Uuid,
        keep_token: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token <> $2")
            .bind(user_id)
            .bind(keep_token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Expiry is compared in Rust-encoded RFC 3339, the same form it was written in.
    pub async fn delete_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
