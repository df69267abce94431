//! LLM backend implementations for ChatRelay.
//!
//! All providers implement the `chatrelay_core::Provider` trait.
//! [`build_from_config`] picks the one named by `default_provider`.

pub mod anthropic;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
