//! Append-only JSONL transcript of answered exchanges.
//!
//! Independent of the history store: one line per successful request,
//! written best-effort. Lines are serialized through a mutex so concurrent
//! requests never interleave partial writes.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// One transcript line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub model: String,
    pub question: String,
    pub response: String,
}

pub struct TranscriptLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TranscriptLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the file and its directory if needed.
    pub async fn append(&self, entry: &TranscriptEntry) -> std::io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// [`append`](Self::append), logging instead of returning failures.
    pub async fn record(&self, entry: &TranscriptEntry) {
        if let Err(e) = self.append(entry).await {
            warn!(
                path = %self.path.display(),
                session_id = %entry.session_id,
                error = %e,
                "Failed to write transcript entry"
            );
        }
    }
}
