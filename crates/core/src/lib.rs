//! MentorLink Core Library
//!
//! This crate provides the client-side messaging layer for the MentorLink
//! platform, including:
//! - Conversation state, delivery filtering and presence signaling
//! - The bidirectional event channel (websocket and in-memory)
//! - The REST API client for roster, history and mentor links
//! - Configuration management
//!
//! It is used by the CLI crate and by any other frontend.

pub mod api;
pub mod channel;
pub mod chat;
pub mod config;
pub mod error;
pub mod platform;
pub mod roster;

// Re-export commonly used types
pub use api::{ApiClient, MentorLink, Profile, StudentRequest};
pub use channel::{EventChannel, EventStream, MemoryChannel, SendAck, ServerEvent, SocketChannel};
pub use chat::{
    ConversationController, ConversationEvent, HistoryTicket, Message, MessageView, Notice,
    NoticeKind, PendingSend, SelectionState, SendTicket, UserId,
};
pub use config::Config;
pub use error::{Error, Result};
pub use roster::{Counterpart, Roster, RosterEntry};
