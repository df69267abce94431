use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use chatrelay_chat::{ChatReply, ChatRequest};
use chatrelay_core::exchange::{Exchange, SessionId};

use crate::error::ApiError;
use crate::{MAX_HISTORY_LIMIT, SharedState};

#[derive(Serialize)]
pub(crate) struct RootResponse {
    message: &'static str,
}

pub(crate) async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "ChatRelay API running successfully",
    })
}

#[derive(Deserialize)]
pub(crate) struct ChatBody {
    question: String,
    #[serde(default)]
    model: Option<String>,
    session_id: String,
}

pub(crate) async fn chat(
    State(state): State<SharedState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = body?;

    let reply = state
        .chat
        .chat(ChatRequest {
            session_id: SessionId::from(body.session_id),
            question: body.question,
            model: body.model,
        })
        .await?;

    Ok(Json(reply))
}

#[derive(Deserialize)]
pub(crate) struct HistoryParams {
    limit: Option<usize>,
}

#[derive(Serialize)]
pub(crate) struct HistoryResponse {
    session_id: SessionId,
    count: usize,
    exchanges: Vec<ExchangeView>,
}

#[derive(Serialize)]
struct ExchangeView {
    user_input: String,
    chatbot_response: String,
    timestamp: DateTime<Utc>,
}

impl From<Exchange> for ExchangeView {
    fn from(e: Exchange) -> Self {
        Self {
            user_input: e.user_input,
            chatbot_response: e.chatbot_response,
            timestamp: e.timestamp,
        }
    }
}

pub(crate) async fn history(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(params) = params?;
    let session_id = SessionId::from(session_id);
    let limit = params
        .limit
        .unwrap_or(state.chat.settings().history_limit)
        .min(MAX_HISTORY_LIMIT);

    let (exchanges, count) = match tokio::try_join!(
        state.chat.history(&session_id, limit),
        state.chat.count(&session_id)
    ) {
        Ok(found) => found,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to read history");
            return Err(ApiError::from_read(e));
        }
    };

    Ok(Json(HistoryResponse {
        session_id,
        count,
        exchanges: exchanges.into_iter().map(ExchangeView::from).collect(),
    }))
}
