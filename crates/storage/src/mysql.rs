//! MySQL / MariaDB history store.
//!
//! Behind the `mysql` feature flag. `TIMESTAMP(6)` columns come back as
//! `DateTime<Utc>` through sqlx's chrono support.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use tracing::{debug, info};

use chatrelay_config::redact_url;
use chatrelay_core::error::StorageError;
use chatrelay_core::exchange::{Exchange, SessionId};
use chatrelay_core::store::{ExchangeStore, chronological};

pub struct MysqlStore {
    pool: MySqlPool,
    table: String,
}

impl MysqlStore {
    pub async fn connect(
        database_url: &str,
        table: &str,
        max_connections: u32,
    ) -> Result<Self, StorageError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connection(format!("MySQL connection failed: {e}")))?;

        info!(url = %redact_url(database_url), table = %table, "Connected to MySQL");
        Ok(Self::from_pool(pool, table))
    }

    pub fn from_pool(pool: MySqlPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    fn row_to_exchange(row: &MySqlRow) -> Result<Exchange, StorageError> {
        let get_err = |col: &str, e: sqlx::Error| StorageError::Query(format!("{col} column: {e}"));

        let session_id: String = row.try_get("session_id").map_err(|e| get_err("session_id", e))?;
        let timestamp: DateTime<Utc> = row.try_get("timestamp").map_err(|e| get_err("timestamp", e))?;

        Ok(Exchange {
            session_id: SessionId::from(session_id),
            user_input: row.try_get("user_input").map_err(|e| get_err("user_input", e))?,
            chatbot_response: row
                .try_get("chatbot_response")
                .map_err(|e| get_err("chatbot_response", e))?,
            timestamp,
        })
    }
}

// MySQL has no CREATE INDEX IF NOT EXISTS, so the index is declared inline.
// Index names are scoped to their table, so a fixed name stays under the
// 64-character identifier limit for any accepted table name.
fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
            id BIGINT AUTO_INCREMENT PRIMARY KEY, \
            session_id VARCHAR(255) NOT NULL, \
            user_input LONGTEXT NOT NULL, \
            chatbot_response LONGTEXT NOT NULL, \
            timestamp TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6), \
            INDEX idx_session_recent (session_id, id)\
        ) CHARACTER SET utf8mb4"
    )
}

fn insert_sql(table: &str) -> String {
    format!("INSERT INTO {table} (session_id, user_input, chatbot_response) VALUES (?, ?, ?)")
}

fn recent_sql(table: &str) -> String {
    format!(
        "SELECT session_id, user_input, chatbot_response, timestamp FROM {table} \
         WHERE session_id = ? ORDER BY id DESC LIMIT ?"
    )
}

fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) AS cnt FROM {table} WHERE session_id = ?")
}

#[async_trait]
impl ExchangeStore for MysqlStore {
    fn name(&self) -> &str {
        "mysql"
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        sqlx::query(&create_table_sql(&self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Migration(format!("{} table: {e}", self.table)))?;

        debug!(table = %self.table, "MySQL schema ready");
        Ok(())
    }

    async fn append(
        &self,
        session_id: &SessionId,
        user_input: &str,
        chatbot_response: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(&insert_sql(&self.table))
            .bind(session_id.as_str())
            .bind(user_input)
            .bind(chatbot_response)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Write(format!("INSERT failed: {e}")))?;
        Ok(())
    }

    async fn fetch_recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<Exchange>, StorageError> {
        let rows = sqlx::query(&recent_sql(&self.table))
            .bind(session_id.as_str())
            .bind(limit as u64)
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
        let row = sqlx::query(&count_sql(&self.table))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_inline_session_index() {
        let sql = create_table_sql("chat_history");
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS chat_history"));
        assert!(sql.contains("INDEX idx_session_recent (session_id, id)"));
        assert!(sql.contains("AUTO_INCREMENT"));
        assert!(sql.contains("utf8mb4"));
    }

    #[test]
    fn longest_table_name_keeps_identifiers_in_limit() {
        let table = format!("t{}", "x".repeat(63));
        assert!(chatrelay_config::is_sql_identifier(&table));

        let sql = create_table_sql(&table);
        let index = sql
            .split("INDEX ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap();
        assert!(index.len() <= 64);
        assert!(!sql.contains(&format!("idx_{table}")));
    }

    #[test]
    fn queries_use_positional_placeholders() {
        assert!(insert_sql("t").ends_with("VALUES (?, ?, ?)"));
        assert!(recent_sql("t").ends_with("ORDER BY id DESC LIMIT ?"));
        assert!(!count_sql("t").contains('$'));
    }
}
