use std::path::Path;

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use super::{HistoryEntry, SessionState, SessionStore, StoreError};

/// Durable store keeping one row per session with the window as JSON.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!(
                    "Failed to create session db directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let conn_str = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&conn_str)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to session db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS session_state (
                session_id TEXT PRIMARY KEY,
                history TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Backend(format!("Failed to init session_state table: {}", e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, session_id: &str) -> Result<SessionState, StoreError> {
        let row = sqlx::query("SELECT history FROM session_state WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let Some(row) = row else {
            return Ok(SessionState::new(session_id));
        };

        let raw: String = row
            .try_get("history")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let history: Vec<HistoryEntry> = serde_json::from_str(&raw)?;

        Ok(SessionState {
            session_id: session_id.to_string(),
            history,
        })
    }

    async fn put(&self, session_id: &str, state: SessionState) -> Result<(), StoreError> {
        let history = serde_json::to_string(&state.history)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO session_state (session_id, history, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET history = excluded.history, updated_at = excluded.updated_at",
        )
        .bind(session_id)
        .bind(history)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }
}
