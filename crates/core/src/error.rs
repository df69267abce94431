//! Error types for the ChatRelay domain.
//!
//! One enum per boundary: [`ProviderError`] for model backends and
//! [`StorageError`] for the history store.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Schema initialization failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_status_and_message() {
        let err = ProviderError::ApiError {
            status_code: 502,
            message: "upstream unavailable".into(),
        };
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("upstream unavailable"));
    }

    #[test]
    fn storage_error_keeps_detail() {
        let err = StorageError::Write("disk full".into());
        assert!(err.to_string().contains("disk full"));
    }
}
