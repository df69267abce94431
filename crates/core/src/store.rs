//! Exchange store trait: append-only, session-scoped chat history.
//!
//! Every backend (SQLite, PostgreSQL, MySQL, in-memory) implements
//! [`ExchangeStore`] with identical semantics:
//!
//! - `initialize` is idempotent and safe to call on every start
//! - `append` writes exactly once; no internal retry
//! - `fetch_recent` returns at most `limit` exchanges for one session,
//!   ordered oldest-first even though backends read newest-first

use crate::error::StorageError;
use crate::exchange::{Exchange, SessionId};
use async_trait::async_trait;

/// The core ExchangeStore trait.
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "postgres", "mysql", "in_memory").
    fn name(&self) -> &str;

    /// Ensure the history table (and its index) exists.
    async fn initialize(&self) -> std::result::Result<(), StorageError>;

    /// Persist one exchange; the store assigns the timestamp.
    async fn append(
        &self,
        session_id: &SessionId,
        user_input: &str,
        chatbot_response: &str,
    ) -> std::result::Result<(), StorageError>;

    /// The `limit` most recent exchanges of a session, oldest first.
    async fn fetch_recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> std::result::Result<Vec<Exchange>, StorageError>;

    /// Number of exchanges stored for a session.
    async fn count(&self, session_id: &SessionId) -> std::result::Result<usize, StorageError>;

    /// The newest exchange of a session, if any.
    async fn latest(
        &self,
        session_id: &SessionId,
    ) -> std::result::Result<Option<Exchange>, StorageError> {
        Ok(self.fetch_recent(session_id, 1).await?.pop())
    }
}

/// Reverse a newest-first page into chronological order.
///
/// Backends query `ORDER BY id DESC LIMIT n` so the database can use the
/// index; this restores the oldest-first contract.
pub fn chronological(mut newest_first: Vec<Exchange>) -> Vec<Exchange> {
    newest_first.reverse();
    newest_first
}
