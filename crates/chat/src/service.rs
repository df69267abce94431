//! The request handler: one question in, one persisted answer out.

use std::sync::Arc;

use chatrelay_config::{AppConfig, AppendFailurePolicy};
use chatrelay_core::exchange::{Exchange, SessionId};
use chatrelay_core::provider::Provider;
use chatrelay_core::store::ExchangeStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::context::format_context;
use crate::error::ChatError;
use crate::prompt::PromptInvoker;
use crate::transcript::{TranscriptEntry, TranscriptLog};

const EMPTY_QUESTION: &str = "Question cannot be empty.";

/// Settings fixed at startup.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub default_model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Past exchanges fed back as context
    pub history_limit: usize,
    pub output_limit: Option<usize>,
    pub on_append_failure: AppendFailurePolicy,
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            history_limit: config.chat.history_limit,
            output_limit: config.chat.output_limit,
            on_append_failure: config.chat.on_append_failure,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub session_id: SessionId,
    pub question: String,
    /// `None` or blank selects the configured default model
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub question: String,
    pub model: String,
    pub response: String,
}

/// Runs the fetch → assemble → invoke → persist path for each request.
///
/// Shared behind an `Arc` by every connection; holds no per-request state.
pub struct ChatService {
    store: Arc<dyn ExchangeStore>,
    invoker: PromptInvoker,
    settings: ChatSettings,
    transcript: Option<TranscriptLog>,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ExchangeStore>,
        provider: Arc<dyn Provider>,
        settings: ChatSettings,
    ) -> Self {
        let invoker = PromptInvoker::new(provider, settings.temperature, settings.max_tokens);
        Self {
            store,
            invoker,
            settings,
            transcript: None,
        }
    }

    /// Also append every answered exchange to a JSONL transcript.
    pub fn with_transcript(mut self, transcript: TranscriptLog) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn ExchangeStore> {
        &self.store
    }

    /// Answer one question in the context of its session.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let ChatRequest {
            session_id,
            question,
            model,
        } = request;

        if question.trim().is_empty() {
            debug!(session_id = %session_id, "Rejected empty question");
            return Err(ChatError::Validation(EMPTY_QUESTION.into()));
        }

        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_model.clone());

        debug!(session_id = %session_id, model = %model, "Fetching context");
        let history = self.recent_or_empty(&session_id).await;
        let context = format_context(&history, self.settings.output_limit);

        debug!(
            session_id = %session_id,
            model = %model,
            provider = self.invoker.provider_name(),
            exchanges = history.len(),
            "Invoking model"
        );
        let response = self
            .invoker
            .invoke(&model, &context, &question)
            .await
            .inspect_err(|e| {
                error!(session_id = %session_id, model = %model, error = %e, "Model backend failed");
            })?;

        debug!(session_id = %session_id, model = %model, "Persisting exchange");
        if let Err(e) = self.store.append(&session_id, &question, &response).await {
            match self.settings.on_append_failure {
                AppendFailurePolicy::Fail => {
                    error!(session_id = %session_id, model = %model, error = %e, "Failed to persist exchange");
                    return Err(ChatError::Storage(e));
                }
                AppendFailurePolicy::Log => {
                    warn!(session_id = %session_id, model = %model, error = %e, "Failed to persist exchange; returning answer anyway");
                }
            }
        }

        if let Some(transcript) = &self.transcript {
            transcript
                .record(&TranscriptEntry {
                    timestamp: Utc::now(),
                    session_id: session_id.to_string(),
                    model: model.clone(),
                    question: question.clone(),
                    response: response.clone(),
                })
                .await;
        }

        info!(session_id = %session_id, model = %model, "Chat request answered");
        Ok(ChatReply {
            session_id,
            question,
            model,
            response,
        })
    }

    /// Stored exchanges of a session, oldest first.
    pub async fn history(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<Exchange>, ChatError> {
        Ok(self.store.fetch_recent(session_id, limit).await?)
    }

    pub async fn count(&self, session_id: &SessionId) -> Result<usize, ChatError> {
        Ok(self.store.count(session_id).await?)
    }

    // Fetch failures degrade to an empty context.
    async fn recent_or_empty(&self, session_id: &SessionId) -> Vec<Exchange> {
        match self
            .store
            .fetch_recent(session_id, self.settings.history_limit)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to fetch history; continuing without context");
                Vec::new()
            }
        }
    }
}
