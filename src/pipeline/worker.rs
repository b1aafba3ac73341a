// Ingestion worker: queue notification -> object fetch -> database row.
//
// One message at a time, strictly sequential. Scaling out means running more
// worker processes against the same queue; nothing here coordinates between
// them, and duplicates under redelivery are accepted.
//
// Per cycle:
//   receive (long poll) -> decode -> for each notification: filter, fetch,
//   persist -> acknowledge.
// A missing object or a filtered-out key skips that notification only. A
// transient fetch or write failure abandons the whole message so the queue
// redelivers it after the visibility timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::filter::{FilterDecision, KeyFilter};
use super::state::{CycleError, MessageOutcome, WorkerState, WorkerStats};
use crate::config::{self, Config};
use crate::db::models::IngestedRecord;
use crate::db::RecordSink;
use crate::notification::{self, DecodeError};
use crate::queue::{MessageQueue, QueueMessage};
use crate::storage::{FetchError, ObjectStore};

/// Tunables for the poll loop.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub wait_time: Duration,
    pub error_backoff: Duration,
    pub filter: KeyFilter,
    /// Receive count at which a malformed message is deleted. 0 disables.
    pub malformed_discard_after: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_secs(config::DEFAULT_WAIT_SECONDS),
            error_backoff: Duration::from_secs(config::DEFAULT_BACKOFF_SECONDS),
            filter: KeyFilter::default(),
            malformed_discard_after: config::DEFAULT_MALFORMED_DISCARD_AFTER,
        }
    }
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            wait_time: config.wait_time,
            error_backoff: config.error_backoff,
            filter: KeyFilter::new(config.allowed_suffixes.iter().cloned()),
            malformed_discard_after: config.malformed_discard_after,
        }
    }
}

pub struct IngestWorker {
    queue: Arc<dyn MessageQueue>,
    store: Arc<dyn ObjectStore>,
    sink: Arc<dyn RecordSink>,
    settings: WorkerSettings,
    state: watch::Sender<WorkerState>,
}

impl IngestWorker {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn ObjectStore>,
        sink: Arc<dyn RecordSink>,
        settings: WorkerSettings,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            queue,
            store,
            sink,
            settings,
            state,
        }
    }

    /// Current position in the cycle.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch state transitions (for status reporting or tests).
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    fn transition(&self, next: WorkerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Worker state");
        }
    }

    /// Poll until `shutdown` is cancelled, then return what was done.
    ///
    /// Errors never escape: transient failures are logged and followed by a
    /// backoff. The backoff and the receive long-poll both wake on shutdown.
    pub async fn run(&self, shutdown: &CancellationToken) -> WorkerStats {
        info!(
            wait_secs = self.settings.wait_time.as_secs(),
            suffixes = ?self.settings.filter.suffixes(),
            "Starting worker polling"
        );

        let mut stats = WorkerStats::default();

        while !shutdown.is_cancelled() {
            match self.poll_once(shutdown).await {
                Ok(Some(outcome)) => stats.record_outcome(&outcome),
                Ok(None) => {}
                Err(e) => {
                    stats.record_failure(&e);
                    error!(
                        error = %e,
                        backoff_secs = self.settings.error_backoff.as_secs_f64(),
                        "Cycle failed, message left for redelivery"
                    );
                    self.transition(WorkerState::Idle);

                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.error_backoff) => {}
                    }
                }
            }
        }

        self.transition(WorkerState::ShuttingDown);
        info!(
            received = stats.messages_received,
            acknowledged = stats.messages_acknowledged,
            ingested = stats.records_ingested,
            skipped = stats.notifications_skipped,
            malformed = stats.malformed,
            discarded = stats.discarded,
            interrupted = stats.interrupted,
            transient_failures = stats.transient_failures,
            "Worker stopped"
        );
        stats
    }

    /// One receive-and-process cycle. `Ok(None)` when the long poll returned
    /// nothing or shutdown interrupted the wait.
    pub async fn poll_once(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<Option<MessageOutcome>, CycleError> {
        self.transition(WorkerState::Receiving);

        let received = tokio::select! {
            _ = shutdown.cancelled() => {
                self.transition(WorkerState::Idle);
                return Ok(None);
            }
            received = self.queue.receive(self.settings.wait_time) => {
                received.map_err(CycleError::Receive)?
            }
        };

        let Some(message) = received else {
            self.transition(WorkerState::Idle);
            return Ok(None);
        };

        let outcome = self.process_message(&message, shutdown).await?;
        self.transition(WorkerState::Idle);
        Ok(Some(outcome))
    }

    /// Decode, filter, fetch, persist, and acknowledge one message.
    pub async fn process_message(
        &self,
        message: &QueueMessage,
        shutdown: &CancellationToken,
    ) -> Result<MessageOutcome, CycleError> {
        self.transition(WorkerState::Decoding);

        let notifications = match notification::decode(&message.body) {
            Ok(n) => n,
            Err(e) => return self.settle_malformed(message, e).await,
        };

        if notifications.is_empty() {
            info!(message_id = %message.message_id, "Message has no records, acknowledging");
        }

        let mut ingested = 0;
        let mut skipped = 0;

        for n in &notifications {
            let key = n.object_key.as_str();

            if let FilterDecision::Skip(reason) = self.settings.filter.evaluate(n) {
                info!(key, reason = %reason, "Skipping notification");
                skipped += 1;
                continue;
            }

            if shutdown.is_cancelled() {
                warn!(
                    message_id = %message.message_id,
                    key,
                    "Shutdown requested mid-message, leaving it for redelivery"
                );
                return Ok(MessageOutcome::Interrupted);
            }

            info!(key, "New file detected");
            self.transition(WorkerState::Fetching);
            let content = match self.store.fetch(key).await {
                Ok(content) => content,
                Err(FetchError::NotFound { .. }) => {
                    warn!(key, "Object no longer exists, skipping");
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            debug!(key, content = %content, "File content");

            self.transition(WorkerState::Persisting);
            let record = IngestedRecord::new(key, content);
            self.sink
                .append(&record)
                .await
                .map_err(|source| CycleError::Persist {
                    key: key.to_string(),
                    source,
                })?;
            info!(key, bytes = record.content.len(), "Saved file to database");
            ingested += 1;
        }

        self.transition(WorkerState::Acknowledging);
        self.queue
            .acknowledge(message)
            .await
            .map_err(CycleError::Acknowledge)?;
        debug!(message_id = %message.message_id, ingested, skipped, "Message acknowledged");

        Ok(MessageOutcome::Acknowledged { ingested, skipped })
    }

    /// A payload that will never decode. Leave it for redelivery until the
    /// queue says it has come back often enough, then delete it.
    async fn settle_malformed(
        &self,
        message: &QueueMessage,
        err: DecodeError,
    ) -> Result<MessageOutcome, CycleError> {
        let threshold = self.settings.malformed_discard_after;
        let exhausted = threshold > 0 && message.receive_count.is_some_and(|c| c >= threshold);

        if !exhausted {
            error!(
                message_id = %message.message_id,
                receive_count = ?message.receive_count,
                error = %err,
                "Malformed payload, leaving message for redelivery"
            );
            return Ok(MessageOutcome::Malformed);
        }

        error!(
            message_id = %message.message_id,
            receive_count = ?message.receive_count,
            error = %err,
            body = %message.body,
            "Malformed payload redelivered too often, discarding"
        );
        self.transition(WorkerState::Acknowledging);
        self.queue
            .acknowledge(message)
            .await
            .map_err(CycleError::Acknowledge)?;
        Ok(MessageOutcome::Discarded)
    }
}
