// Ingestion pipeline: the worker loop and the pieces it is built from.

pub mod filter;
pub mod state;
pub mod worker;

pub use filter::{FilterDecision, KeyFilter, SkipReason};
pub use state::{CycleError, MessageOutcome, WorkerState, WorkerStats};
pub use worker::{IngestWorker, WorkerSettings};
