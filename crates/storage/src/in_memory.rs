//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chatrelay_core::error::StorageError;
use chatrelay_core::exchange::{Exchange, SessionId};
use chatrelay_core::store::{ExchangeStore, chronological};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory store that keeps exchanges in insertion order.
/// Nothing survives a restart.
pub struct InMemoryStore {
    rows: Arc<RwLock<Vec<Exchange>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(
        &self,
        session_id: &SessionId,
        user_input: &str,
        chatbot_response: &str,
    ) -> Result<(), StorageError> {
        let mut rows = self.rows.write().await;

        // Clock steps backwards must not reorder a session's timestamps.
        let floor = rows
            .iter()
            .rev()
            .find(|e| &e.session_id == session_id)
            .map(|e| e.timestamp);
        let now = Utc::now();
        let timestamp = floor.map_or(now, |f| f.max(now));

        rows.push(Exchange {
            session_id: session_id.clone(),
            user_input: user_input.to_string(),
            chatbot_response: chatbot_response.to_string(),
            timestamp,
        });
        Ok(())
    }

    async fn fetch_recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<Exchange>, StorageError> {
        let rows = self.rows.read().await;
        let newest_first: Vec<Exchange> = rows
            .iter()
            .rev()
            .filter(|e| &e.session_id == session_id)
            .take(limit)
            .cloned()
            .collect();
        Ok(chronological(newest_first))
    }

    async fn count(&self, session_id: &SessionId) -> Result<usize, StorageError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|e| &e.session_id == session_id).count())
    }
}
