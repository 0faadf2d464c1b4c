use crate::engine::TaskState;
use crate::storage::StatusStore;
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::error::Error;

/// Build history kept in a SQLite database, one row per task of each build.
pub struct SqliteStorage {
    pub pool: Pool<Sqlite>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl StatusStore for SqliteStorage {
    async fn init(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS task_runs (
                build_id TEXT NOT NULL,
                id TEXT NOT NULL,
                family TEXT NOT NULL,
                state TEXT NOT NULL,
                attempts INTEGER NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (build_id, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_task_record(
        &self,
        build_id: &str,
        task_id: &str,
        family: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO task_runs (id, build_id, family, state, attempts)
            VALUES (?, ?, ?, 'pending', 0)
            ON CONFLICT(build_id, id) DO UPDATE SET
                family = excluded.family,
                state = 'pending',
                attempts = 0,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(task_id)
        .bind(build_id)
        .bind(family)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_task_state(
        &self,
        build_id: &str,
        task_id: &str,
        state: TaskState,
        attempts: usize,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let updated = sqlx::query(
            r#"
            UPDATE task_runs
            SET state = ?, attempts = ?, updated_at = CURRENT_TIMESTAMP
            WHERE build_id = ? AND id = ?
            "#,
        )
        .bind(state.as_str())
        .bind(attempts as i64)
        .bind(build_id)
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(format!("Task '{}' not found in build '{}'", task_id, build_id).into());
        }
        Ok(())
    }

    async fn get_build_status(
        &self,
        build_id: &str,
    ) -> Result<Vec<(String, TaskState, usize)>, Box<dyn Error + Send + Sync>> {
        let rows = sqlx::query(
            r#"
            SELECT id, state, attempts
            FROM task_runs
            WHERE build_id = ?
            ORDER BY id
            "#,
        )
        .bind(build_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| -> Result<(String, TaskState, usize), Box<dyn Error + Send + Sync>> {
                let id: String = row.try_get(0)?;
                let state: String = row.try_get(1)?;
                let attempts: i64 = row.try_get(2)?;
                let state = TaskState::from_str(&state)
                    .ok_or_else(|| format!("unknown state '{}' for task '{}'", state, id))?;
                Ok((id, state, attempts as usize))
            })
            .collect()
    }
}

mod tests;
