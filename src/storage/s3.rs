// S3 implementation of ObjectStore, bound to a single bucket.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use tracing::debug;

use super::traits::{FetchError, ObjectStore};

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn fetch(&self, key: &str) -> Result<String, FetchError> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let missing = e.as_service_error().is_some_and(|se| se.is_no_such_key())
                    || e.raw_response()
                        .is_some_and(|raw| raw.status().as_u16() == 404);
                if missing {
                    return Err(FetchError::NotFound {
                        key: key.to_string(),
                    });
                }
                return Err(FetchError::Transient {
                    key: key.to_string(),
                    source: anyhow::Error::new(e),
                });
            }
        };

        // The body streams; a failure mid-stream is a network problem.
        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| FetchError::Transient {
                key: key.to_string(),
                source: anyhow::Error::new(e),
            })?
            .into_bytes();

        debug!(bucket = %self.bucket, key, bytes = bytes.len(), "Fetched object");

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
