//! In-process event channel for tests.
//!
//! [`MemoryChannel::open`] returns the client-side handle together with a
//! [`MemoryServer`] that plays the platform's role: it observes every frame
//! the client emits, resolves send acknowledgments, and pushes
//! [`ServerEvent`]s back.

use crate::channel::protocol::{SendAck, ServerEvent};
use crate::channel::transport::{AckFuture, EventChannel, EventStream};
use crate::chat::types::UserId;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// One frame emitted by the client, as seen from the server side.
#[derive(Debug)]
pub enum SentFrame {
    /// A `send_message` emission awaiting its acknowledgment.
    Message {
        /// Recipient's user ID.
        receiver_id: UserId,
        /// Message body.
        body: String,
        /// Resolver for the client's ack future.
        ack: oneshot::Sender<SendAck>,
    },
    /// A `typing` signal.
    Typing {
        /// Recipient's user ID.
        to_id: UserId,
        /// Whether composing is in progress.
        is_typing: bool,
    },
    /// A `mark_seen` signal.
    MarkSeen {
        /// The other participant.
        other_id: UserId,
    },
}

/// Client half of the in-process channel.
pub struct MemoryChannel {
    local_user: UserId,
    outbound: mpsc::UnboundedSender<SentFrame>,
}

/// Server half of the in-process channel.
pub struct MemoryServer {
    frames: mpsc::UnboundedReceiver<SentFrame>,
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl MemoryChannel {
    /// Open a connected channel pair for the given local user.
    pub fn open(local_user: UserId) -> (Arc<Self>, EventStream, MemoryServer) {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let channel = Arc::new(Self {
            local_user,
            outbound: frame_tx,
        });
        let server = MemoryServer {
            frames: frame_rx,
            events: event_tx,
        };
        (channel, event_rx, server)
    }

    fn emit(&self, frame: SentFrame) -> Result<()> {
        self.outbound
            .send(frame)
            .map_err(|_| Error::Channel("channel closed".to_string()))
    }
}

#[async_trait]
impl EventChannel for MemoryChannel {
    fn local_user(&self) -> &UserId {
        &self.local_user
    }

    async fn send_message(&self, receiver_id: &UserId, body: &str) -> Result<AckFuture> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.emit(SentFrame::Message {
            receiver_id: receiver_id.clone(),
            body: body.to_string(),
            ack: ack_tx,
        })?;
        Ok(ack_rx)
    }

    async fn send_typing(&self, to_id: &UserId, is_typing: bool) -> Result<()> {
        self.emit(SentFrame::Typing {
            to_id: to_id.clone(),
            is_typing,
        })
    }

    async fn send_mark_seen(&self, other_id: &UserId) -> Result<()> {
        self.emit(SentFrame::MarkSeen {
            other_id: other_id.clone(),
        })
    }
}

impl MemoryServer {
    /// Push a server event to the client.
    pub fn push(&self, event: ServerEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| Error::Channel("client event stream closed".to_string()))
    }

    /// Wait for the next frame from the client.
    pub async fn next_frame(&mut self) -> Option<SentFrame> {
        self.frames.recv().await
    }

    /// Take the next frame if one is already queued.
    pub fn try_next_frame(&mut self) -> Option<SentFrame> {
        self.frames.try_recv().ok()
    }

    /// Drain every queued frame.
    pub fn drain_frames(&mut self) -> Vec<SentFrame> {
        let mut out = Vec::new();
        while let Some(frame) = self.try_next_frame() {
            out.push(frame);
        }
        out
    }
}
