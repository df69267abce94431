//! Shared test doubles for the chat path.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chatrelay_core::error::{ProviderError, StorageError};
use chatrelay_core::exchange::{Exchange, SessionId};
use chatrelay_core::message::Message;
use chatrelay_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use chatrelay_core::store::ExchangeStore;
use chatrelay_storage::InMemoryStore;

/// A provider that answers every request the same way and records what it
/// was sent.
pub struct ScriptedProvider {
    outcome: Result<String, ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            outcome: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The user message of the `n`th request.
    pub fn prompt(&self, n: usize) -> String {
        self.requests.lock().unwrap()[n].messages[1].content.clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let text = self.outcome.clone()?;
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }
}

/// An in-memory store whose reads or writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    pub fail_fetch: AtomicBool,
    pub fail_append: AtomicBool,
}

impl FlakyStore {
    pub fn failing_fetch() -> Self {
        let store = Self::default();
        store.fail_fetch.store(true, Ordering::SeqCst);
        store
    }

    pub fn failing_append() -> Self {
        let store = Self::default();
        store.fail_append.store(true, Ordering::SeqCst);
        store
    }
}

#[async_trait]
impl ExchangeStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, session_id: &SessionId, u: &str, r: &str) -> Result<(), StorageError> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(StorageError::Write("database is locked".into()));
        }
        self.inner.append(session_id, u, r).await
    }

    async fn fetch_recent(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<Exchange>, StorageError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StorageError::Query("connection reset".into()));
        }
        self.inner.fetch_recent(session_id, limit).await
    }

    async fn count(&self, session_id: &SessionId) -> Result<usize, StorageError> {
        self.inner.count(session_id).await
    }
}
