//! Database validation service for ensuring migrations are up to date

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

/// Tables every route relies on.
pub const REQUIRED_TABLES: &[&str] = &[
    "users",
    "sessions",
    "saved_recipes",
    "meal_plans",
    "meal_plan_recipes",
    "categories",
    "expenses",
    "incomes",
];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("missing tables: {0}")]
    MissingTables(String),
}

/// Database validator for ensuring schema is correct
pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check if the database is initialized and every required table exists
    pub async fn validate(&self) -> Result<ValidationResult, DatabaseValidationError> {
        let migrations_table_exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
        )
        .fetch_one(&self.pool)
        .await?
            > 0;

        if !migrations_table_exists {
            warn!("Database not initialized - _sqlx_migrations table does not exist");
            return Ok(ValidationResult {
                is_initialized: false,
                migrations_applied: 0,
                latest_migration: None,
                missing_tables: REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
            });
        }

        let migrations_applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        let missing_tables = self.validate_tables(REQUIRED_TABLES).await?;
        let latest_migration = self.get_latest_migration().await?;

        if missing_tables.is_empty() {
            info!(migrations_applied, "Database validation complete");
        } else {
            warn!(missing = ?missing_tables, "Database is missing tables");
        }

        Ok(ValidationResult {
            is_initialized: true,
            migrations_applied: migrations_applied as usize,
            latest_migration,
            missing_tables,
        })
    }

    /// Like [`validate`](Self::validate), but a missing table is an error.
    pub async fn ensure_ready(&self) -> Result<ValidationResult, DatabaseValidationError> {
        let result = self.validate().await?;
        if !result.missing_tables.is_empty() {
            return Err(DatabaseValidationError::MissingTables(
                result.missing_tables.join(", "),
            ));
        }
        Ok(result)
    }

    /// Returns the subset of `required_tables` that do not exist
    pub async fn validate_tables(
        &self,
        required_tables: &[&str],
    ) -> Result<Vec<String>, DatabaseValidationError> {
        let mut missing_tables = Vec::new();

        for table in required_tables {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?
                > 0;

            if !exists {
                missing_tables.push(table.to_string());
            }
        }

        Ok(missing_tables)
    }

    /// Get the latest applied migration
    pub async fn get_latest_migration(&self) -> Result<Option<String>, DatabaseValidationError> {
        let migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(migration)
    }
}

/// Result of database validation
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_initialized: bool,
    pub migrations_applied: usize,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.is_initialized && self.missing_tables.is_empty()
    }

    pub fn summary(&self) -> String {
        if !self.is_initialized {
            "Database not initialized - migrations need to be run".to_string()
        } else if !self.missing_tables.is_empty() {
            format!("Database missing tables: {}", self.missing_tables.join(", "))
        } else {
            format!(
                "Database OK - {} migrations applied",
                self.migrations_applied
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    #[tokio::test]
    async fn migrated_database_is_ok() {
        let db = DBService::new_in_memory().await.unwrap();
        let result = DatabaseValidator::new(db.pool.clone()).ensure_ready().await.unwrap();
        assert!(result.is_ok());
        assert_eq!(result.migrations_applied, 3);
        assert_eq!(result.latest_migration.as_deref(), Some("finance"));
    }

    #[tokio::test]
    async fn empty_database_is_not_initialized() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let result = DatabaseValidator::new(pool).validate().await.unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.missing_tables.len(), REQUIRED_TABLES.len());
        assert!(result.summary().contains("not initialized"));
    }
}
