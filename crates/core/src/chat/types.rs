//! Core data types for the messaging system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier for a platform user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single message exchanged between a student and a mentor.
///
/// Messages are immutable once created. An optimistic local copy and the
/// server-confirmed copy of the same send are distinct values that share a
/// [`MessageKey`]; reconciliation happens through the key, never by mutating
/// a stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender's user ID.
    pub sender_id: UserId,
    /// Recipient's user ID.
    pub receiver_id: UserId,
    /// Message body (plain text).
    #[serde(rename = "message")]
    pub body: String,
    /// When the message was created (UTC; client clock for optimistic copies).
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new outgoing message stamped with the current time.
    pub fn new_outgoing(sender_id: UserId, receiver_id: UserId, body: String) -> Self {
        Self {
            sender_id,
            receiver_id,
            body,
            created_at: Utc::now(),
        }
    }

    /// Duplicate-detection identity for this message.
    pub fn key(&self) -> MessageKey {
        MessageKey {
            sender_id: self.sender_id.clone(),
            body: self.body.clone(),
            at_secs: self.created_at.timestamp(),
        }
    }

    /// Check whether this message was sent by the given user.
    pub fn is_from(&self, user_id: &UserId) -> bool {
        self.sender_id == *user_id
    }

    /// Check whether this message travels between the two given users,
    /// in either direction.
    pub fn is_between(&self, a: &UserId, b: &UserId) -> bool {
        (self.sender_id == *a && self.receiver_id == *b)
            || (self.sender_id == *b && self.receiver_id == *a)
    }

    /// Get the other party of this message relative to the given user.
    pub fn counterpart_of(&self, user_id: &UserId) -> &UserId {
        if self.sender_id == *user_id {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }
}

/// Identity under the strict duplicate rule: sender, body, and the creation
/// time truncated to whole seconds.
///
/// Sub-second jitter between an optimistic copy and its server echo collapses
/// onto one key, which is what makes echo reconciliation work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    /// Sender's user ID.
    pub sender_id: UserId,
    /// Message body.
    pub body: String,
    /// Creation time in whole seconds since the epoch.
    pub at_secs: i64,
}

/// How a stored message entered the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOrigin {
    /// Loaded from the history endpoint.
    History,
    /// Delivered live over the event channel.
    Live,
    /// Optimistic local append awaiting the server echo.
    LocalEcho,
}

/// Render-ready view of one conversation entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    /// Sender's user ID.
    pub sender_id: UserId,
    /// Message body.
    pub body: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether the local user sent this message.
    pub mine: bool,
    /// Whether the server has confirmed this entry.
    pub confirmed: bool,
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A transient user-facing notice. Display and dismissal timing belong to
/// the frontend.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    /// Severity.
    pub kind: NoticeKind,
    /// Human-readable text.
    pub text: String,
}

impl Notice {
    /// Create an informational notice.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    /// Create an error notice.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}
