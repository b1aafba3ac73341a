// Object store trait: fetch the full text of a named object.
//
// Implementors: S3ObjectStore (aws-sdk-s3). The error type is classified so
// the worker can tell "gone, skip it" from "try again later".

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The object was deleted (or never existed) between notification and fetch.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Anything worth retrying, such as a network failure or throttling.
    #[error("transient failure fetching {key}: {source}")]
    Transient {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download an object and return its content as text.
    async fn fetch(&self, key: &str) -> Result<String, FetchError>;
}
