// Object-store change notifications: the unit of work inside a queue message.
//
// A single queue payload may carry several notifications (S3 batches events),
// or none at all (the s3:TestEvent sent when a subscription is created).

pub mod decoder;

pub use decoder::{decode, DecodeError};

/// What happened to the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Created,
    Other,
}

impl EventType {
    /// Classify an S3 `eventName` such as `ObjectCreated:Put`.
    pub fn from_event_name(name: &str) -> Self {
        if name.starts_with("ObjectCreated:") {
            EventType::Created
        } else {
            EventType::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "created",
            EventType::Other => "other",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One decoded object-store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    /// Object key, already URL-decoded.
    pub object_key: String,
    pub event_type: EventType,
}

impl ChangeNotification {
    pub fn created(object_key: impl Into<String>) -> Self {
        Self {
            object_key: object_key.into(),
            event_type: EventType::Created,
        }
    }
}
