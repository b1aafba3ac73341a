// PgSink: PostgreSQL backend implementing the RecordSink trait.
//
// Uses sqlx PgPool for native async queries. All queries use runtime
// parameter binding (not compile-time macros) to avoid requiring
// DATABASE_URL at compile time.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_core::row::Row;
use sqlx_postgres::{PgConnectOptions, PgSslMode, Postgres};
use tracing::info;

use super::models::{IngestedRecord, StoredRecord};
use super::traits::RecordSink;
use crate::config::DbSettings;

/// Type alias for the PostgreSQL connection pool.
pub type PgPool = Pool<Postgres>;

/// 0x4E455855535F4442 = ASCII "NEXUS_DB" as a big-endian i64.
const SCHEMA_LOCK_KEY: i64 = 0x4E45_5855_535F_4442;

const SCHEMA_DDL: &str = include_str!("../../migrations/postgres/0001_processed_files.sql");

pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    /// Connect using the worker's DB settings. Does not touch the schema.
    pub async fn connect(settings: &DbSettings) -> Result<Self> {
        let options = connect_options(settings)?;
        let target = format!(
            "{}:{}/{}",
            options.get_host(),
            options.get_port(),
            options.get_database().unwrap_or_default()
        );

        let pool = PoolOptions::<Postgres>::new()
            .max_connections(settings.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to PostgreSQL at {target}"))?;

        info!(target = %target, "Connected to PostgreSQL");
        Ok(Self { pool })
    }
}

/// Build connect options from either DATABASE_URL or the individual DB_* settings.
pub fn connect_options(settings: &DbSettings) -> Result<PgConnectOptions> {
    let ssl_mode = PgSslMode::from_str(&settings.ssl_mode)
        .with_context(|| format!("Invalid DB_SSL_MODE: {}", settings.ssl_mode))?;

    if let Some(url) = &settings.database_url {
        let options = PgConnectOptions::from_str(url).context("Invalid DATABASE_URL")?;
        return Ok(options);
    }

    let mut options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .database(&settings.name)
        .ssl_mode(ssl_mode);
    if !settings.password.is_empty() {
        options = options.password(&settings.password);
    }
    Ok(options)
}

/// Lock statement followed by the migration DDL, sent as one batch.
fn schema_sql() -> String {
    format!("SELECT pg_advisory_xact_lock({SCHEMA_LOCK_KEY});\n{SCHEMA_DDL}")
}

#[async_trait]
impl RecordSink for PgSink {
    /// Create the processed_files table under a transaction-scoped advisory lock.
    ///
    /// `CREATE TABLE IF NOT EXISTS` is not safe against concurrent callers in
    /// Postgres (two sessions can both pass the existence check and one then
    /// fails on the pg_type unique index), so workers starting together
    /// serialize on the lock. The lock and the DDL go out as one simple-query
    /// batch, which Postgres runs as a single implicit transaction: the lock
    /// is released on commit, and any failure rolls everything back without
    /// leaving the pooled connection mid-transaction.
    async fn ensure_schema(&self) -> Result<()> {
        let sql = schema_sql();
        sqlx_core::raw_sql::raw_sql(&sql)
            .execute(&self.pool)
            .await
            .context("Failed to create processed_files table")?;

        info!("Table processed_files ready");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn append(&self, record: &IngestedRecord) -> Result<()> {
        // Postgres TEXT cannot hold NUL; a file containing one would otherwise
        // fail forever and never leave the queue.
        let content = if record.content.contains('\0') {
            record.content.replace('\0', "")
        } else {
            record.content.clone()
        };

        sqlx_core::query::query(
            "INSERT INTO processed_files (file_key, content, processed_at)
             VALUES ($1, $2, $3)",
        )
        .bind(record.key.as_str())
        .bind(content)
        .bind(record.processed_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert processed_files row for {}", record.key))?;
        Ok(())
    }

    async fn record_count(&self) -> Result<i64> {
        let row = sqlx_core::query::query("SELECT COUNT(*)::bigint FROM processed_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn recent_records(&self, limit: u32) -> Result<Vec<StoredRecord>> {
        // sqlx binds this as i32; anything above i32::MAX is effectively unlimited.
        let rows = sqlx_core::query::query(
            "SELECT id::bigint, file_key, length(content)::bigint, processed_at
             FROM processed_files
             ORDER BY processed_at DESC, id DESC
             LIMIT $1",
        )
        .bind(limit.min(i32::MAX as u32) as i32)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(StoredRecord {
                id: row.get(0),
                file_key: row.get(1),
                content_length: row.get(2),
                processed_at: row.get::<DateTime<Utc>, _>(3),
            });
        }
        Ok(records)
    }
}
