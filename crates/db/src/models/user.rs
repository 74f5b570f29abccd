use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

/// Full `users` row. Holds the password hash, so it is never serialized;
/// use [`User::to_info`] for responses.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User information safe to send to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUser {
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
}

impl User {
    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Emails are stored lowercased; callers pass the normalised form.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateUser,
        password_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, email, name, password_hash, role)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.email)
        .bind(&data.name)
        .bind(password_hash)
        .bind(data.role)
        .fetch_one(pool)
        .await
    }

    pub async fn update_name(
        pool: &SqlitePool,
        id: Uuid,
        name: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET name = $1, updated_at = datetime('now', 'subsec')
               WHERE id = $2
               RETURNING *"#,
        )
        .bind(name)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn update_password(
        pool: &SqlitePool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = datetime('now', 'subsec') WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update_role(
        pool: &SqlitePool,
        id: Uuid,
        role: UserRole,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET role = $1, updated_at = datetime('now', 'subsec')
               WHERE id = $2
               RETURNING *"#,
        )
        .bind(role)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Owned sessions, recipes, plans and finance rows go with it (ON DELETE CASCADE).
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            email: email.to_string(),
            name: Some("Hanako".to_string()),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn create_and_find_by_email() {
        let db = DBService::new_in_memory().await.unwrap();
        let created = User::create(&db.pool, &new_user("hanako@example.com"), "hash")
            .await
            .unwrap();

        let found = User::find_by_email(&db.pool, "hanako@example.com")
            .await
            .unwrap()
            .expect("user exists");
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, UserRole::User);
        assert!(!found.is_admin());
    }

    #[tokio::test]
    async fn duplicate_email_is_unique_violation() {
        let db = DBService::new_in_memory().await.unwrap();
        User::create(&db.pool, &new_user("dup@example.com"), "hash")
            .await
            .unwrap();
        let err = User::create(&db.pool, &new_user("dup@example.com"), "hash")
            .await
            .unwrap_err();
        assert!(crate::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn role_round_trips_through_sqlite() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = User::create(&db.pool, &new_user("role@example.com"), "hash")
            .await
            .unwrap();
        let promoted = User::update_role(&db.pool, user.id, UserRole::Admin)
            .await
            .unwrap();
        assert!(promoted.is_admin());
        assert_eq!(promoted.to_info().role, UserRole::Admin);
    }
}
