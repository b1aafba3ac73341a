// Decoder for S3 event notification payloads as delivered through SQS.
//
// Only the fields the worker acts on are modelled; serde ignores the rest
// (bucket ARN, object size, eTag, requester identity...).

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use thiserror::Error;

use super::{ChangeNotification, EventType};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed notification payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    /// Absent (or null) on test events, which are valid no-op payloads.
    #[serde(rename = "Records", default)]
    records: Option<Vec<EventRecord>>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(rename = "eventName", default)]
    event_name: Option<String>,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// Decode a queue payload into notifications, in payload order.
///
/// Records without an `eventName` are treated as creations: the queue is
/// subscribed to `ObjectCreated` events only.
pub fn decode(payload: &str) -> Result<Vec<ChangeNotification>, DecodeError> {
    let envelope: EventEnvelope = serde_json::from_str(payload)?;

    let notifications = envelope
        .records
        .unwrap_or_default()
        .into_iter()
        .map(|record| ChangeNotification {
            object_key: decode_object_key(&record.s3.object.key),
            event_type: record
                .event_name
                .as_deref()
                .map(EventType::from_event_name)
                .unwrap_or(EventType::Created),
        })
        .collect();

    Ok(notifications)
}

/// S3 form-encodes keys in notifications: spaces arrive as `+`, and a literal
/// `+` arrives as `%2B`. Swap `+` first, then percent-decode.
pub fn decode_object_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
