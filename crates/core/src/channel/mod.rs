//! Bidirectional event channel between the client and the platform.
//!
//! This module provides:
//! - Tagged JSON event schemas shared by every transport
//! - The [`EventChannel`] trait the conversation controller talks through
//! - A WebSocket transport used against the real platform
//! - An in-process transport for tests
//!
//! A channel is opened once per session, keyed to the local user at connect
//! time. Delivery is at-least-once with per-direction ordering only;
//! everything above this module is written to tolerate duplicates.

pub mod memory;
pub mod protocol;
pub mod socket;
pub mod transport;

pub use memory::{MemoryChannel, MemoryServer, SentFrame};
pub use protocol::{ClientEvent, SendAck, ServerEvent};
pub use socket::SocketChannel;
pub use transport::{AckFuture, EventChannel, EventStream};
