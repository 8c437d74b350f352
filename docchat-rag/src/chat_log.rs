//! Persistent JSON log of chat transcripts.
//!
//! The log file holds a JSON array of [`ChatLogEntry`] values; each save appends one
//! timestamped entry and rewrites the file atomically.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::index::write_atomic;
use crate::prompt::Message;

/// One saved transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatLogEntry {
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<Message>,
}

/// Read every entry of the log at `path`. A missing file is an empty log.
pub async fn read_chat_log(path: &Path) -> Result<Vec<ChatLogEntry>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Append `messages` as a new entry to the log at `path`, creating it if needed.
pub async fn append_chat_log(path: &Path, messages: &[Message]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut entries = read_chat_log(path).await?;
    entries.push(ChatLogEntry { timestamp: Utc::now(), messages: messages.to_vec() });

    let bytes = serde_json::to_vec_pretty(&entries)?;
    write_atomic(path, &bytes).await?;
    debug!(path = %path.display(), entries = entries.len(), "saved chat log");
    Ok(())
}
