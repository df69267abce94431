//! # ChatRelay Core
//!
//! Domain types, traits, and error definitions for the ChatRelay service.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates:
//! - [`ExchangeStore`]: `chatrelay-storage` (SQLite, PostgreSQL, MySQL, in-memory)
//! - [`Provider`]: `chatrelay-providers` (OpenAI-compatible, Anthropic)

pub mod error;
pub mod exchange;
pub mod message;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, StorageError};
pub use exchange::{Exchange, SessionId};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use store::ExchangeStore;
