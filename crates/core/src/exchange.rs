//! Exchange and session domain types.
//!
//! An [`Exchange`] is one persisted (question, answer) turn. Exchanges are
//! grouped by a client-chosen [`SessionId`] and are immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, client-supplied conversation identifier.
///
/// Not validated for format; any string the client sends is a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh random session (used by clients that don't bring one).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stored turn of conversation.
///
/// The store's row id is not part of this type; callers only ever see
/// exchanges already sorted oldest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// Session this exchange belongs to
    pub session_id: SessionId,

    /// What the user asked
    pub user_input: String,

    /// What the model answered (never empty; see the chat fallback text)
    pub chatbot_response: String,

    /// Assigned by the store at write time
    pub timestamp: DateTime<Utc>,
}
