//! The fixed prompt template and the single model round trip.

use std::sync::Arc;

use chatrelay_core::error::ProviderError;
use chatrelay_core::message::Message;
use chatrelay_core::provider::{Provider, ProviderRequest};
use tracing::{debug, warn};

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant who answers user queries \
accurately and politely. You are aware of the previous conversation history provided below.";

/// Stored and returned when the backend answers with nothing usable.
pub const FALLBACK_RESPONSE: &str = "I'm sorry, I couldn't generate a valid response.";

/// The two prompt messages: system instruction, then context plus question.
pub fn build_messages(context: &str, question: &str) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(format!("Context:\n{context}\n\nQuestion: {question}")),
    ]
}

/// Empty or whitespace-only output becomes [`FALLBACK_RESPONSE`].
pub fn normalize_response(content: &str) -> String {
    if content.trim().is_empty() {
        FALLBACK_RESPONSE.to_string()
    } else {
        content.to_string()
    }
}

/// Sends the prompt to the configured backend, once.
pub struct PromptInvoker {
    provider: Arc<dyn Provider>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl PromptInvoker {
    pub fn new(provider: Arc<dyn Provider>, temperature: f32, max_tokens: Option<u32>) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask `model` the question with `context` and return normalized text.
    pub async fn invoke(
        &self,
        model: &str,
        context: &str,
        question: &str,
    ) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: model.to_string(),
            messages: build_messages(context, question),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self.provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model responded"
            );
        }

        if response.message.content.trim().is_empty() {
            warn!(model = %model, "Model returned empty output, using fallback response");
        }
        Ok(normalize_response(&response.message.content))
    }
}
