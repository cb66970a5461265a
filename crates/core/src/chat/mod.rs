//! Real-time conversation coordination between a student and a mentor.
//!
//! This module keeps a live 1:1 conversation consistent over an
//! at-least-once event channel. Features include:
//!
//! - Optimistic local sends reconciled against their server echo
//! - Strict duplicate suppression plus a per-sender rate ceiling
//! - Typing indicators with automatic idle timeout and expiry
//! - Read receipts per conversation selection
//! - Unread markers for conversations that are not on screen
//! - Stale-response isolation across counterpart switches

pub mod controller;
pub mod filter;
pub mod presence;
pub mod store;
pub mod types;

pub use controller::{
    ConversationController, ConversationEvent, HistoryTicket, PendingSend, SelectionState,
    SendTicket,
};
pub use filter::{dedup_history, Admission, DeliveryFilter, ThrottleLedger};
pub use presence::PresenceSignaler;
pub use store::{ConversationStore, StoredMessage};
pub use types::*;
