// Notification filter: which objects are worth downloading.
//
// Keeps creation events whose key ends with an allow-listed suffix. The
// match is case-sensitive, like the S3 key itself.

use crate::notification::{ChangeNotification, EventType};

/// Why a notification was not ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotCreated(EventType),
    SuffixNotAllowed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotCreated(event) => write!(f, "event type is {event}, not created"),
            SkipReason::SuffixNotAllowed => write!(f, "key suffix not in allow-list"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Keep,
    Skip(SkipReason),
}

#[derive(Debug, Clone)]
pub struct KeyFilter {
    suffixes: Vec<String>,
}

impl Default for KeyFilter {
    fn default() -> Self {
        Self::new([crate::config::DEFAULT_SUFFIX])
    }
}

impl KeyFilter {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn key_allowed(&self, key: &str) -> bool {
        self.suffixes.iter().any(|suffix| key.ends_with(suffix.as_str()))
    }

    pub fn evaluate(&self, notification: &ChangeNotification) -> FilterDecision {
        if notification.event_type != EventType::Created {
            return FilterDecision::Skip(SkipReason::NotCreated(notification.event_type));
        }
        if !self.key_allowed(&notification.object_key) {
            return FilterDecision::Skip(SkipReason::SuffixNotAllowed);
        }
        FilterDecision::Keep
    }
}
