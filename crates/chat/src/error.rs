use chatrelay_core::error::{ProviderError, StorageError};
use thiserror::Error;

/// Why a chat request did not produce a reply.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Bad input from the caller; safe to show them the message.
    #[error("{0}")]
    Validation(String),

    #[error("Model backend failed: {0}")]
    Backend(#[from] ProviderError),

    #[error("Chat history storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ChatError::Validation(_))
    }
}
