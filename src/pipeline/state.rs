// Worker state, per-message outcomes, and run counters.

use thiserror::Error;

use crate::storage::FetchError;

/// Where the worker is in its cycle. Published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Idle,
    Receiving,
    Decoding,
    Fetching,
    Persisting,
    Acknowledging,
    ShuttingDown,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Receiving => "receiving",
            WorkerState::Decoding => "decoding",
            WorkerState::Fetching => "fetching",
            WorkerState::Persisting => "persisting",
            WorkerState::Acknowledging => "acknowledging",
            WorkerState::ShuttingDown => "shutting-down",
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How one received message was settled, short of a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Every notification was handled; the message was deleted.
    Acknowledged { ingested: usize, skipped: usize },
    /// Payload could not be decoded; left on the queue.
    Malformed,
    /// Payload could not be decoded and hit the discard threshold; deleted.
    Discarded,
    /// Shutdown arrived mid-message; left on the queue for another worker.
    Interrupted,
}

/// Failures that abort a cycle without acknowledging. All are transient:
/// the worker backs off and polls again.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to receive from queue: {0:#}")]
    Receive(#[source] anyhow::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to persist {key}: {source:#}")]
    Persist {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to acknowledge message: {0:#}")]
    Acknowledge(#[source] anyhow::Error),
}

impl CycleError {
    /// False only when the failure happened before any message arrived.
    pub fn had_message(&self) -> bool {
        !matches!(self, CycleError::Receive(_))
    }
}

/// Counters accumulated across a `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub messages_received: u64,
    pub messages_acknowledged: u64,
    pub records_ingested: u64,
    pub notifications_skipped: u64,
    pub malformed: u64,
    pub discarded: u64,
    pub interrupted: u64,
    pub transient_failures: u64,
}

impl WorkerStats {
    pub fn record_outcome(&mut self, outcome: &MessageOutcome) {
        self.messages_received += 1;
        match *outcome {
            MessageOutcome::Acknowledged { ingested, skipped } => {
                self.messages_acknowledged += 1;
                self.records_ingested += ingested as u64;
                self.notifications_skipped += skipped as u64;
            }
            MessageOutcome::Malformed => self.malformed += 1,
            MessageOutcome::Discarded => {
                self.malformed += 1;
                self.discarded += 1;
                self.messages_acknowledged += 1;
            }
            MessageOutcome::Interrupted => self.interrupted += 1,
        }
    }

    pub fn record_failure(&mut self, err: &CycleError) {
        if err.had_message() {
            self.messages_received += 1;
        }
        self.transient_failures += 1;
    }
}
