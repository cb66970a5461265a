//! Seam between the conversation logic and the wire.
//!
//! The controller talks to an [`EventChannel`] and consumes an
//! [`EventStream`]; which transport sits behind them is invisible to it.
//! The channel is opened once per session, keyed to the local user at
//! connect time, and is never reopened by the core. Reconnection is the
//! transport's own concern.

use crate::channel::protocol::{SendAck, ServerEvent};
use crate::chat::types::UserId;
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// Resolves exactly once with the server's verdict on one send. Dropped by
/// the transport without resolving if the connection dies first.
pub type AckFuture = oneshot::Receiver<SendAck>;

/// Inbound server events in arrival order.
pub type EventStream = mpsc::UnboundedReceiver<ServerEvent>;

/// Outbound half of the bidirectional event channel.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// The user this channel was opened for.
    fn local_user(&self) -> &UserId;

    /// Emit `send_message` and return the single-shot acknowledgment.
    async fn send_message(&self, receiver_id: &UserId, body: &str) -> Result<AckFuture>;

    /// Emit a `typing` signal. Fire and forget.
    async fn send_typing(&self, to_id: &UserId, is_typing: bool) -> Result<()>;

    /// Emit a `mark_seen` signal. Fire and forget.
    async fn send_mark_seen(&self, other_id: &UserId) -> Result<()>;
}
