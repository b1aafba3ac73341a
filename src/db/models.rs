// Data models: Rust structs that map to database rows.
//
// These are separate from the sink implementations so the worker can build
// records without depending on sqlx directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file's content captured by the worker. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestedRecord {
    pub key: String,
    pub content: String,
    pub processed_at: DateTime<Utc>,
}

impl IngestedRecord {
    /// Stamp a freshly fetched object with the current time.
    pub fn new(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            processed_at: Utc::now(),
        }
    }
}

/// A stored row summarized for `nexus status`. Content is reduced to its length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    pub file_key: String,
    pub content_length: i64,
    pub processed_at: DateTime<Utc>,
}
