//! The chat path of ChatRelay.
//!
//! One request runs straight through:
//!
//! 1. **Validate** the question
//! 2. **Fetch** the session's recent exchanges from the store
//! 3. **Assemble** them into a bounded text context
//! 4. **Invoke** the model once with the fixed two-message prompt
//! 5. **Persist** the new exchange and return the answer
//!
//! There is no loop and no tool use; every request is one model call.

pub mod context;
pub mod error;
pub mod prompt;
pub mod service;
pub mod transcript;

#[cfg(test)]
mod test_helpers;

pub use context::format_context;
pub use error::ChatError;
pub use prompt::{FALLBACK_RESPONSE, PromptInvoker, SYSTEM_PROMPT};
pub use service::{ChatReply, ChatRequest, ChatService, ChatSettings};
pub use transcript::{TranscriptEntry, TranscriptLog};
