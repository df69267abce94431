//! SQLite history store.
//!
//! One table (default `chat_history`) with an autoincrement `id` that
//! recovers insertion order, and a `(session_id, id)` index so the
//! newest-first page for one session is an index range scan.
//!
//! Timestamps are written by SQLite itself as RFC 3339 text with
//! millisecond precision.

use async_trait::async_trait;
use chatrelay_core::error::StorageError;
use chatrelay_core::exchange::{Exchange, SessionId};
use chatrelay_core::store::{ExchangeStore, chronological};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// A SQLite-backed exchange store.
pub struct SqliteStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and initialize the
    /// default `chat_history` table.
    ///
    /// Pass `":memory:"` for an in-process ephemeral database.
    pub async fn new(path: &str) -> Result<Self, StorageError> {
        let store = Self::open(path, "chat_history", 4).await?;
        store.initialize().await?;
        Ok(store)
    }

    /// Connect without touching the schema. `table` must already be a
    /// validated identifier.
    pub async fn open(path: &str, table: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = if path == ":memory:" || path.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(path)
                .map_err(|e| StorageError::InvalidConfig(format!("Invalid SQLite path: {e}")))?
        } else {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StorageError::Connection(format!("Cannot create {}: {e}", parent.display()))
                })?;
            }
            SqliteConnectOptions::new().filename(path)
        };

        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to open SQLite: {e}")))?;

        info!(path = %path, table = %table, "SQLite history store opened");
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Create from an existing pool (useful for testing).
    pub fn from_pool(pool: SqlitePool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    fn create_table_sql(&self) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {t} (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id       TEXT NOT NULL,
                user_input       TEXT NOT NULL,
                chatbot_response TEXT NOT NULL,
                timestamp        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )
            "#,
            t = self.table
        )
    }

    fn create_index_sql(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_session ON {t}(session_id, id)",
            t = self.table
        )
    }

    fn row_to_exchange(row: &sqlx::sqlite::SqliteRow) -> Result<Exchange, StorageError> {
        let session_id: String = row
            .try_get("session_id")
            .map_err(|e| StorageError::Query(format!("session_id column: {e}")))?;
        let user_input: String = row
            .try_get("user_input")
            .map_err(|e| StorageError::Query(format!("user_input column: {e}")))?;
        let chatbot_response: String = row
            .try_get("chatbot_response")
            .map_err(|e| StorageError::Query(format!("chatbot_response column: {e}")))?;
        let timestamp_str: String = row
            .try_get("timestamp")
            .map_err(|e| StorageError::Query(format!("timestamp column: {e}")))?;

        let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StorageError::Query(format!("bad timestamp '{timestamp_str}': {e}")))?;

        Ok(Exchange {
            session_id: SessionId::from(session_id),
            user_input,
            chatbot_response,
            timestamp,
        })
    }
}

#[async_trait]
impl ExchangeStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        sqlx::query(&self.create_table_sql())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Migration(format!("{} table: {e}", self.table)))?;

        sqlx::query(&self.create_index_sql())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Migration(format!("session index: {e}")))?;

        debug!(table = %self.table, "SQLite schema ready");
        Ok(())
    }

    async fn append(
        &self,
        session_id: &SessionId,
        user_input: &str,
        chatbot_response: &str,
    ) -> Result<(), StorageError> {
        let sql = format!(
            "INSERT INTO {} (session_id, user_input, chatbot_response) VALUES (?1, ?2, ?3)",
            self.table
        );
        sqlx::query(&sql)
            .bind(session_id.as_str())
            .bind(user_input)
            .bind(chatbot_response)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Write(format!("INSERT failed: {e}")))?;

        debug!(session_id = %session_id, "Stored exchange");
        Ok(())
    }

    async fn fetch_recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<Exchange>, StorageError> {
        let sql = format!(
            "SELECT session_id, user_input, chatbot_response, timestamp FROM {} \
             WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2",
            self.table
        );
        let rows = sqlx::query(&sql)
            .bind(session_id.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Query(format!("Fetch recent: {e}")))?;

        let newest_first = rows
            .iter()
            .map(Self::row_to_exchange)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chronological(newest_first))
    }

    async fn count(&self, session_id: &SessionId) -> Result<usize, StorageError> {
        let sql = format!("SELECT COUNT(*) AS cnt FROM {} WHERE session_id = ?1", self.table);
        let row = sqlx::query(&sql)
            .bind(session_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Query(format!("Count: {e}")))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| StorageError::Query(format!("cnt column: {e}")))?;
        Ok(count as usize)
    }
}
