// Configuration loaded from environment variables.
//
// All secrets come from env vars (never hardcoded). The .env file is loaded
// automatically at startup via dotenvy. Validation happens here, once, so a
// misconfigured worker dies at startup instead of polling with half a config.

use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "postgres";
pub const DEFAULT_WAIT_SECONDS: u64 = 20;
pub const DEFAULT_BACKOFF_SECONDS: u64 = 5;
pub const DEFAULT_MALFORMED_DISCARD_AFTER: u32 = 5;
pub const DEFAULT_SUFFIX: &str = ".txt";

/// SQS rejects long-poll waits above 20 seconds.
const MAX_WAIT_SECONDS: u64 = 20;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where the worker reads from. Both values are required before polling.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueTarget {
    pub queue_url: String,
    pub bucket_name: String,
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone)]
pub struct DbSettings {
    /// Full connection URL; when set, the DB_* fields below are ignored.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    /// libpq-style sslmode (disable, allow, prefer, require, verify-ca, verify-full)
    pub ssl_mode: String,
    pub max_connections: u32,
}

/// Central configuration for every subcommand.
#[derive(Debug, Clone)]
pub struct Config {
    pub queue_url: Option<String>,
    pub bucket_name: Option<String>,
    pub aws_region: String,
    pub db: DbSettings,
    /// Long-poll wait for each receive call.
    pub wait_time: Duration,
    /// Pause after a transient failure before the next receive.
    pub error_backoff: Duration,
    /// Object key suffixes worth ingesting.
    pub allowed_suffixes: Vec<String>,
    /// Receive count at which an undecodable message is deleted. 0 disables.
    pub malformed_discard_after: u32,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db = DbSettings {
            database_url: get("DATABASE_URL"),
            host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or("DB_PORT", get("DB_PORT"), DEFAULT_DB_PORT)?,
            user: get("DB_USER").unwrap_or_else(|| "postgres".to_string()),
            password: get("DB_PASSWORD").unwrap_or_default(),
            name: get("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            ssl_mode: get("DB_SSL_MODE").unwrap_or_else(|| "prefer".to_string()),
            max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 2)?,
        };

        let wait_seconds: u64 =
            parse_or("WAIT_TIME_SECONDS", get("WAIT_TIME_SECONDS"), DEFAULT_WAIT_SECONDS)?;
        if wait_seconds > MAX_WAIT_SECONDS {
            return Err(ConfigError::Invalid {
                key: "WAIT_TIME_SECONDS",
                value: wait_seconds.to_string(),
                reason: format!("must be at most {MAX_WAIT_SECONDS}"),
            });
        }

        let backoff_seconds: u64 = parse_or(
            "ERROR_BACKOFF_SECS",
            get("ERROR_BACKOFF_SECS"),
            DEFAULT_BACKOFF_SECONDS,
        )?;

        Ok(Self {
            queue_url: get("QUEUE_URL"),
            bucket_name: get("BUCKET_NAME"),
            aws_region: get("AWS_REGION")
                .or_else(|| get("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            db,
            wait_time: Duration::from_secs(wait_seconds),
            error_backoff: Duration::from_secs(backoff_seconds),
            allowed_suffixes: parse_suffixes(get("ALLOWED_SUFFIXES").as_deref()),
            malformed_discard_after: parse_or(
                "MALFORMED_DISCARD_AFTER",
                get("MALFORMED_DISCARD_AFTER"),
                DEFAULT_MALFORMED_DISCARD_AFTER,
            )?,
        })
    }

    /// Check that the queue and bucket are configured.
    /// Call this before starting the worker loop.
    pub fn require_worker(&self) -> Result<QueueTarget, ConfigError> {
        let mut missing = Vec::new();
        if self.queue_url.is_none() {
            missing.push("QUEUE_URL");
        }
        if self.bucket_name.is_none() {
            missing.push("BUCKET_NAME");
        }

        match (&self.queue_url, &self.bucket_name) {
            (Some(queue_url), Some(bucket_name)) => Ok(QueueTarget {
                queue_url: queue_url.clone(),
                bucket_name: bucket_name.clone(),
            }),
            _ => Err(ConfigError::Missing(missing)),
        }
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Comma-separated suffix list. Blank entries are dropped; an empty result
/// falls back to the default suffix.
fn parse_suffixes(raw: Option<&str>) -> Vec<String> {
    let suffixes: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if suffixes.is_empty() {
        vec![DEFAULT_SUFFIX.to_string()]
    } else {
        suffixes
    }
}
