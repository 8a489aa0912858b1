use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::Store;
use crate::config::DatabaseConfig;
use crate::datamodel::{Approach, RowMapping, Task, User};
use crate::error::{LoadError, StoreError};

const SCHEMA: &str = "azdev";

/// Store over the `azdev` Postgres schema.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Opens the pool and checks every row mapping against the live tables.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        let store = Self { pool };
        for mapping in [&User::MAPPING, &Task::MAPPING, &Approach::MAPPING] {
            store.validate(mapping).await?;
        }
        Ok(store)
    }

    async fn validate(&self, mapping: &RowMapping) -> Result<(), StoreError> {
        let existing: Vec<String> = sqlx::query_scalar(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2",
        )
        .bind(SCHEMA)
        .bind(mapping.table)
        .fetch_all(&self.pool)
        .await?;

        let missing: Vec<&'static str> = mapping
            .columns
            .iter()
            .copied()
            .filter(|col| !existing.iter().any(|e| e == col))
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::MissingColumns {
                table: format!("{SCHEMA}.{}", mapping.table),
                missing,
            });
        }

        tracing::debug!(table = mapping.table, "row mapping validated");
        Ok(())
    }
}

fn select(mapping: &RowMapping, tail: &str) -> String {
    format!(
        "SELECT {} FROM {SCHEMA}.{} {tail}",
        mapping.select_list(),
        mapping.table
    )
}

#[async_trait]
impl Store for PgStore {
    async fn users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>, LoadError> {
        let sql = select(&User::MAPPING, "WHERE id = ANY($1)");
        let users = sqlx::query_as(&sql).bind(ids).fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn tasks_by_ids(&self, ids: &[i32]) -> Result<Vec<Task>, LoadError> {
        let sql = select(&Task::MAPPING, "WHERE id = ANY($1) AND is_private = FALSE");
        let tasks = sqlx::query_as(&sql).bind(ids).fetch_all(&self.pool).await?;
        Ok(tasks)
    }

    async fn latest_tasks(&self, limit: i64) -> Result<Vec<Task>, LoadError> {
        let sql = select(
            &Task::MAPPING,
            "WHERE is_private = FALSE ORDER BY created_at DESC LIMIT $1",
        );
        let tasks = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn approaches_by_task_ids(&self, task_ids: &[i32]) -> Result<Vec<Approach>, LoadError> {
        let sql = select(
            &Approach::MAPPING,
            "WHERE task_id = ANY($1) ORDER BY vote_count DESC, created_at DESC",
        );
        let approaches = sqlx::query_as(&sql)
            .bind(task_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(approaches)
    }
}
