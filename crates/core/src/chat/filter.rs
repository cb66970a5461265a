//! Duplicate and flood suppression for live message delivery.
//!
//! Two independent rules guard a conversation:
//!
//! - the strict duplicate rule drops any message whose [`MessageKey`] was
//!   already admitted (idempotent, targets true duplicates such as server
//!   echoes and at-least-once redelivery);
//! - the rate ceiling drops a message arriving less than one window after
//!   the previous admitted message from the same sender.
//!
//! Suppression is a verdict, not an error. Rejected messages are dropped
//! silently with at most a debug log line; nothing is queued or retried.

use crate::chat::types::{Message, MessageKey, UserId};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

/// Verdict for a candidate message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Message passed both rules and was recorded.
    Admitted,
    /// Message matched an already-admitted key.
    Duplicate,
    /// Message arrived inside the sender's throttle window.
    Throttled,
}

impl Admission {
    /// Whether the candidate survived filtering.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Per-sender record of the last admitted message time.
#[derive(Debug, Default)]
pub struct ThrottleLedger {
    last_admitted: HashMap<UserId, DateTime<Utc>>,
}

impl ThrottleLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit the candidate iff it is at least `window` after the sender's
    /// previous admitted message. Admission updates the ledger entry;
    /// rejection leaves it untouched.
    pub fn admit(&mut self, sender: &UserId, at: DateTime<Utc>, window: Duration) -> bool {
        if let Some(last) = self.last_admitted.get(sender) {
            if at.signed_duration_since(*last) < window {
                return false;
            }
        }
        self.last_admitted.insert(sender.clone(), at);
        true
    }

    /// Record an admission stamp directly, bypassing the window check.
    /// Keeps the newest stamp when one is already present.
    pub fn stamp(&mut self, sender: &UserId, at: DateTime<Utc>) {
        let entry = self.last_admitted.entry(sender.clone()).or_insert(at);
        if at > *entry {
            *entry = at;
        }
    }

    /// Last admitted timestamp for a sender, if any.
    pub fn last_admitted(&self, sender: &UserId) -> Option<DateTime<Utc>> {
        self.last_admitted.get(sender).copied()
    }

    /// Forget all senders.
    pub fn reset(&mut self) {
        self.last_admitted.clear();
    }
}

/// Combined strict-dedup and rate-ceiling filter for one delivery direction.
///
/// The controller holds two instances with independently configured windows:
/// one for inbound channel events and one keyed by the local user for
/// outbound sends. The filter state is scoped to the active conversation and
/// is fully reset whenever the conversation is replaced.
#[derive(Debug)]
pub struct DeliveryFilter {
    window: Duration,
    strict_dedup: bool,
    ledger: ThrottleLedger,
    seen: HashSet<MessageKey>,
}

impl DeliveryFilter {
    /// Create a filter with the given window and strict-dedup toggle.
    pub fn new(window: std::time::Duration, strict_dedup: bool) -> Self {
        Self {
            window: Duration::milliseconds(window.as_millis() as i64),
            strict_dedup,
            ledger: ThrottleLedger::new(),
            seen: HashSet::new(),
        }
    }

    /// Run the candidate through both rules. The strict duplicate rule is
    /// checked first: a true duplicate is reported as such even when it
    /// would also fall inside the throttle window.
    pub fn admit(&mut self, message: &Message) -> Admission {
        let key = message.key();

        if self.strict_dedup && self.seen.contains(&key) {
            tracing::debug!(sender = %message.sender_id, "dropping duplicate message");
            return Admission::Duplicate;
        }

        if !self
            .ledger
            .admit(&message.sender_id, message.created_at, self.window)
        {
            tracing::debug!(sender = %message.sender_id, "dropping throttled message");
            return Admission::Throttled;
        }

        if self.strict_dedup {
            self.seen.insert(key);
        }
        Admission::Admitted
    }

    /// Record a message as already delivered without passing a verdict.
    ///
    /// Used when history is installed: later live echoes of those rows must
    /// be caught by the duplicate rule, but history itself is not throttled.
    pub fn remember(&mut self, message: &Message) {
        if self.strict_dedup {
            self.seen.insert(message.key());
        }
    }

    /// Record a locally sent message so the server's echo of it is caught
    /// no matter which rule is enabled: the key joins the seen-set and the
    /// send occupies the sender's throttle window.
    pub fn expect_echo(&mut self, message: &Message) {
        if self.strict_dedup {
            self.seen.insert(message.key());
        }
        self.ledger.stamp(&message.sender_id, message.created_at);
    }

    /// Clear all filter state for a conversation replacement.
    pub fn reset(&mut self) {
        self.ledger.reset();
        self.seen.clear();
    }

    /// Last admitted timestamp for a sender, if any.
    pub fn last_admitted(&self, sender: &UserId) -> Option<DateTime<Utc>> {
        self.ledger.last_admitted(sender)
    }
}

/// One-shot strict duplicate pass over fetched history, preserving order.
///
/// Mirrors what the history endpoint itself does and is idempotent: applying
/// it to its own output returns the same sequence.
pub fn dedup_history(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::with_capacity(messages.len());
    messages
        .into_iter()
        .filter(|m| seen.insert(m.key()))
        .collect()
}
