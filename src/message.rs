//! Push message value type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Delivery priority for a push message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    /// Default priority; may be batched or delayed by the provider.
    Normal,
    /// Time-sensitive; providers should wake the device.
    High,
}

impl std::fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessagePriority::Normal => write!(f, "normal"),
            MessagePriority::High => write!(f, "high"),
        }
    }
}

/// An outbound push notification.
///
/// Messages are realm-agnostic: the realm is supplied separately to
/// [`DelegateRegistry::send`](crate::registry::DelegateRegistry::send),
/// which routes the message to that realm's active delegate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    /// Unique message identifier.
    pub message_id: String,
    /// Opaque recipient handle (device token, endpoint ARN, ...). Its
    /// interpretation belongs to the delegate.
    pub recipient: String,
    /// Optional display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Message body.
    pub body: String,
    /// Delivery priority.
    pub priority: MessagePriority,
    /// Provider-opaque data payload.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
    /// Optional time-to-live in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}

impl PushMessage {
    /// Create a message with a fresh id and normal priority.
    pub fn new(recipient: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            recipient: recipient.into(),
            subject: None,
            body: body.into(),
            priority: MessagePriority::Normal,
            data: HashMap::new(),
            ttl_seconds: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the display title.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the delivery priority.
    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Attach one data payload entry.
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Set the time-to-live.
    pub fn with_ttl_seconds(mut self, ttl: u64) -> Self {
        self.ttl_seconds = Some(ttl);
        self
    }
}
