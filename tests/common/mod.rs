// In-memory fakes for the worker's collaborators.
//
// Each fake records the calls made against it so tests can assert on
// "no fetch happened" or "acknowledged exactly once".

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use nexus::db::models::{IngestedRecord, StoredRecord};
use nexus::db::RecordSink;
use nexus::pipeline::{IngestWorker, KeyFilter, WorkerSettings};
use nexus::queue::{MessageQueue, QueueMessage};
use nexus::storage::{FetchError, ObjectStore};

pub fn message(id: &str, body: &str) -> QueueMessage {
    QueueMessage {
        message_id: id.to_string(),
        body: body.to_string(),
        ack_token: format!("receipt-{id}"),
        receive_count: Some(1),
    }
}

/// Build an S3 notification payload with one ObjectCreated:Put record per key.
pub fn created_payload(keys: &[&str]) -> String {
    let records: Vec<serde_json::Value> = keys
        .iter()
        .map(|key| {
            serde_json::json!({
                "eventName": "ObjectCreated:Put",
                "s3": { "bucket": { "name": "uploads" }, "object": { "key": key } }
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}

// ============================================================
// Queue
// ============================================================

#[derive(Default)]
pub struct FakeQueue {
    pending: Mutex<VecDeque<QueueMessage>>,
    acked: Mutex<Vec<String>>,
    receive_failures: AtomicUsize,
    receive_calls: AtomicUsize,
    /// Cancelled once the queue runs dry, so `run` terminates in tests.
    cancel_when_empty: Mutex<Option<CancellationToken>>,
}

impl FakeQueue {
    pub fn with_messages(messages: Vec<QueueMessage>) -> Self {
        Self {
            pending: Mutex::new(messages.into()),
            ..Default::default()
        }
    }

    pub fn cancel_when_empty(&self, token: CancellationToken) {
        *self.cancel_when_empty.lock().unwrap() = Some(token);
    }

    /// Make the next `n` receive calls fail.
    pub fn fail_next_receives(&self, n: usize) {
        self.receive_failures.store(n, Ordering::SeqCst);
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageQueue for FakeQueue {
    async fn receive(&self, _wait: Duration) -> Result<Option<QueueMessage>> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);

        if self
            .receive_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("simulated receive timeout");
        }

        let next = self.pending.lock().unwrap().pop_front();
        if next.is_none() {
            if let Some(token) = self.cancel_when_empty.lock().unwrap().as_ref() {
                token.cancel();
            }
        }
        Ok(next)
    }

    async fn acknowledge(&self, message: &QueueMessage) -> Result<()> {
        self.acked.lock().unwrap().push(message.message_id.clone());
        Ok(())
    }
}

// ============================================================
// Object store
// ============================================================

#[derive(Default)]
pub struct FakeStore {
    objects: Mutex<HashMap<String, String>>,
    transient: Mutex<HashSet<String>>,
    fetched: Mutex<Vec<String>>,
    /// Cancelled when a fetch happens, to simulate a signal mid-message.
    cancel_on_fetch: Mutex<Option<CancellationToken>>,
}

impl FakeStore {
    pub fn with_objects(objects: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut map = store.objects.lock().unwrap();
            for (key, content) in objects {
                map.insert(key.to_string(), content.to_string());
            }
        }
        store
    }

    /// Fetching this key fails with a transient error.
    pub fn fail_transiently(&self, key: &str) {
        self.transient.lock().unwrap().insert(key.to_string());
    }

    pub fn cancel_on_fetch(&self, token: CancellationToken) {
        *self.cancel_on_fetch.lock().unwrap() = Some(token);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn fetch(&self, key: &str) -> Result<String, FetchError> {
        self.fetched.lock().unwrap().push(key.to_string());

        if let Some(token) = self.cancel_on_fetch.lock().unwrap().as_ref() {
            token.cancel();
        }

        if self.transient.lock().unwrap().contains(key) {
            return Err(FetchError::Transient {
                key: key.to_string(),
                source: anyhow::anyhow!("connection reset by peer"),
            });
        }

        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                key: key.to_string(),
            })
    }
}

// ============================================================
// Sink
// ============================================================

#[derive(Default)]
pub struct FakeSink {
    records: Mutex<Vec<IngestedRecord>>,
    fail_appends: AtomicUsize,
    schema_calls: AtomicUsize,
    closed: AtomicUsize,
}

impl FakeSink {
    /// Make the next `n` appends fail.
    pub fn fail_next_appends(&self, n: usize) {
        self.fail_appends.store(n, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<IngestedRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.key).collect()
    }
}

#[async_trait]
impl RecordSink for FakeSink {
    async fn ensure_schema(&self) -> Result<()> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    async fn append(&self, record: &IngestedRecord) -> Result<()> {
        if self
            .fail_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("simulated write failure");
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn record_count(&self) -> Result<i64> {
        Ok(self.records.lock().unwrap().len() as i64)
    }

    async fn recent_records(&self, limit: u32) -> Result<Vec<StoredRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .enumerate()
            .rev()
            .take(limit as usize)
            .map(|(i, r)| StoredRecord {
                id: i as i64 + 1,
                file_key: r.key.clone(),
                content_length: r.content.len() as i64,
                processed_at: r.processed_at,
            })
            .collect())
    }
}

// ============================================================
// Harness
// ============================================================

pub struct Harness {
    pub queue: Arc<FakeQueue>,
    pub store: Arc<FakeStore>,
    pub sink: Arc<FakeSink>,
    pub worker: IngestWorker,
}

/// Settings with millisecond waits so loop tests finish quickly.
pub fn fast_settings() -> WorkerSettings {
    WorkerSettings {
        wait_time: Duration::from_millis(1),
        error_backoff: Duration::from_millis(10),
        filter: KeyFilter::default(),
        malformed_discard_after: 5,
    }
}

pub fn harness(queue: FakeQueue, store: FakeStore) -> Harness {
    harness_with(queue, store, fast_settings())
}

pub fn harness_with(queue: FakeQueue, store: FakeStore, settings: WorkerSettings) -> Harness {
    let queue = Arc::new(queue);
    let store = Arc::new(store);
    let sink = Arc::new(FakeSink::default());
    let worker = IngestWorker::new(queue.clone(), store.clone(), sink.clone(), settings);
    Harness {
        queue,
        store,
        sink,
        worker,
    }
}
