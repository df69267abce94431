//! HTTP error mapping.
//!
//! Every failure leaves as `{"detail": "..."}`. Only validation problems
//! carry their own text; everything else gets a fixed message so backend
//! and database errors never reach the client.

use std::any::Any;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chatrelay_chat::ChatError;
use serde_json::json;
use tracing::error;

pub const BACKEND_FAILED: &str = "The model backend failed to generate a response.";
pub const STORAGE_FAILED: &str = "Failed to persist chat history.";
pub const HISTORY_READ_FAILED: &str = "Failed to read chat history.";
pub const INTERNAL: &str = "Internal server error.";

#[derive(Debug)]
pub enum ApiError {
    /// 400 with the given detail
    BadRequest(String),
    /// Request body over the size limit
    PayloadTooLarge(String),
    Backend,
    Storage,
    /// Storage failure while serving history
    HistoryRead,
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ApiError::BadRequest(detail) | ApiError::PayloadTooLarge(detail) => detail,
            ApiError::Backend => BACKEND_FAILED,
            ApiError::Storage => STORAGE_FAILED,
            ApiError::HistoryRead => HISTORY_READ_FAILED,
            ApiError::Internal => INTERNAL,
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(detail) => ApiError::BadRequest(detail),
            ChatError::Backend(_) => ApiError::Backend,
            ChatError::Storage(_) => ApiError::Storage,
            ChatError::Internal(_) => ApiError::Internal,
        }
    }
}

impl ApiError {
    /// Map a failure on the read path; storage errors there are not writes.
    pub fn from_read(err: ChatError) -> Self {
        match err {
            ChatError::Storage(_) => ApiError::HistoryRead,
            other => other.into(),
        }
    }
}

/// `CatchPanicLayer` hook: a panicking handler still answers with the
/// generic 500 body.
pub(crate) fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %message, "Request handler panicked");
    ApiError::from(ChatError::Internal(message.to_string())).into_response()
}

// Every JSON rejection except an oversized body maps to 400.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}
