// Record sink trait: backend-agnostic async interface for persistence.
//
// Implementors: PgSink (wraps sqlx). The worker only needs ensure_schema and
// append; the remaining methods back `nexus status` and shutdown.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{IngestedRecord, StoredRecord};

#[async_trait]
pub trait RecordSink: Send + Sync {
    // --- Lifecycle ---

    /// Create the target table if it does not exist. Safe to call repeatedly.
    async fn ensure_schema(&self) -> Result<()>;

    /// Release pooled connections. Called once at shutdown.
    async fn close(&self);

    // --- Writes ---

    /// Append one record. Any error here is treated as transient by the worker.
    async fn append(&self, record: &IngestedRecord) -> Result<()>;

    // --- Reads ---

    /// Total number of ingested rows.
    async fn record_count(&self) -> Result<i64>;

    /// Most recently processed rows, newest first.
    async fn recent_records(&self, limit: u32) -> Result<Vec<StoredRecord>>;
}
