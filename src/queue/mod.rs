// Message queue layer: the source of work for the ingestion worker.

pub mod sqs;
pub mod traits;

pub use sqs::SqsQueue;
pub use traits::{MessageQueue, QueueMessage};
