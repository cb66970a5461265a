//! In-memory state for the active conversation.

use crate::chat::types::{Message, MessageKey, MessageOrigin, MessageView, UserId};

/// One entry in the active conversation.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    /// The message itself, immutable once stored.
    pub message: Message,
    /// How the entry got here.
    pub origin: MessageOrigin,
    /// Whether the server has confirmed this entry. History and live
    /// entries are confirmed by construction; optimistic local appends
    /// start unconfirmed.
    pub confirmed: bool,
}

/// Ordered message list for the currently selected counterpart.
///
/// The list lives for exactly one selection: `reset` replaces it wholesale
/// when the counterpart changes, history is installed once after the fetch
/// completes, and live traffic is appended at the end. Entries are never
/// removed individually.
///
/// History is sorted by creation time exactly once, at install. Appends are
/// not re-sorted; within one sender the channel delivers in order, so the
/// tail stays chronological per sender without further work.
#[derive(Debug, Default)]
pub struct ConversationStore {
    counterpart_id: Option<UserId>,
    messages: Vec<StoredMessage>,
    history_loaded: bool,
}

impl ConversationStore {
    /// Create an empty store with no counterpart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the conversation for a newly selected counterpart.
    pub fn reset(&mut self, counterpart_id: UserId) {
        tracing::debug!(counterpart = %counterpart_id, "resetting conversation");
        self.counterpart_id = Some(counterpart_id);
        self.messages.clear();
        self.history_loaded = false;
    }

    /// Drop the conversation entirely, returning to the no-counterpart state.
    pub fn clear(&mut self) {
        self.counterpart_id = None;
        self.messages.clear();
        self.history_loaded = false;
    }

    /// Install fetched history as the initial population, sorting ascending
    /// by creation time. Returns the number of entries installed.
    pub fn load_history(&mut self, mut messages: Vec<Message>) -> usize {
        // Stable sort: rows with equal timestamps keep their server order.
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        self.messages = messages
            .into_iter()
            .map(|message| StoredMessage {
                message,
                origin: MessageOrigin::History,
                confirmed: true,
            })
            .collect();
        self.history_loaded = true;
        self.messages.len()
    }

    /// Append one message at the end of the conversation.
    pub fn append(&mut self, message: Message, origin: MessageOrigin) {
        let confirmed = !matches!(origin, MessageOrigin::LocalEcho);
        self.messages.push(StoredMessage {
            message,
            origin,
            confirmed,
        });
    }

    /// Whether an entry with the given key is present.
    pub fn contains(&self, key: &MessageKey) -> bool {
        self.messages.iter().any(|e| e.message.key() == *key)
    }

    /// Mark the newest entry matching the key as confirmed. Returns false
    /// when no such entry exists.
    pub fn confirm(&mut self, key: &MessageKey) -> bool {
        for entry in self.messages.iter_mut().rev() {
            if entry.message.key() == *key {
                entry.confirmed = true;
                return true;
            }
        }
        false
    }

    /// The counterpart this conversation belongs to, if one is selected.
    pub fn counterpart_id(&self) -> Option<&UserId> {
        self.counterpart_id.as_ref()
    }

    /// Whether the initial history population has happened.
    pub fn history_loaded(&self) -> bool {
        self.history_loaded
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Raw entries in order.
    pub fn entries(&self) -> &[StoredMessage] {
        &self.messages
    }

    /// Produce the render-ready list relative to the local user. Pure; no
    /// side effects.
    pub fn render(&self, local_user: &UserId) -> Vec<MessageView> {
        self.messages
            .iter()
            .map(|e| MessageView {
                sender_id: e.message.sender_id.clone(),
                body: e.message.body.clone(),
                created_at: e.message.created_at,
                mine: e.message.is_from(local_user),
                confirmed: e.confirmed,
            })
            .collect()
    }
}
