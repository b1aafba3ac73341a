// Nexus: queue-driven ingestion of newly created S3 text files into PostgreSQL.
//
// This is the library root. Each module corresponds to one collaborator of
// the ingestion worker; the binary in main.rs wires them together.

pub mod aws;
pub mod config;
pub mod db;
pub mod notification;
pub mod pipeline;
pub mod queue;
pub mod shutdown;
pub mod status;
pub mod storage;
