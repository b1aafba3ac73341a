// Database layer: PostgreSQL storage for ingested file contents.
//
// The worker talks to `Arc<dyn RecordSink>`; PgSink is the production
// implementation. Schema setup is explicit (ensure_schema) so startup can
// treat a failure as fatal before any message is received.

pub mod models;
pub mod postgres;
pub mod traits;

pub use postgres::PgSink;
pub use traits::RecordSink;

use std::sync::Arc;

use anyhow::Result;

use crate::config::DbSettings;

/// Connect to PostgreSQL and return the sink as a trait object.
pub async fn connect_postgres(settings: &DbSettings) -> Result<Arc<dyn RecordSink>> {
    let sink = PgSink::connect(settings).await?;
    Ok(Arc::new(sink))
}
