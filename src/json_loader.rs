//! Normalized message export loading.
//!
//! Reads a JSON array of message records from disk. Entries are parsed
//! individually so one malformed record drops only itself — input
//! malformation is never fatal.

use std::path::Path;

use crate::error::EngineError;
use crate::types::Message;

/// Load messages from a JSON export file.
pub fn load_messages(path: &Path) -> Result<Vec<Message>, EngineError> {
    let content = std::fs::read_to_string(path)?;
    let raw: Vec<serde_json::Value> = serde_json::from_str(&content)?;

    let mut messages = Vec::with_capacity(raw.len());
    for (idx, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<Message>(value) {
            Ok(message) => messages.push(message),
            Err(e) => {
                log::warn!("Skipping malformed message record {} in {}: {}", idx, path.display(), e);
            }
        }
    }

    Ok(messages)
}
