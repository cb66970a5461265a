//! WebSocket implementation of the event channel.
//!
//! Frames are JSON text: `{"event": ..., "data": ...}` with an added
//! numeric `id` on frames that expect an acknowledgment. The server answers
//! those with `{"event": "ack", "id": n, "data": {"ok": ..., "error": ...}}`
//! and the reader routes the payload to the matching in-flight oneshot.
//! Malformed or unrecognized inbound frames are logged and dropped.

use crate::channel::protocol::{ClientEvent, SendAck, ServerEvent};
use crate::channel::transport::{AckFuture, EventChannel, EventStream};
use crate::chat::types::UserId;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

/// Keepalive ping period.
const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct OutboundFrame<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(flatten)]
    event: &'a ClientEvent,
}

#[derive(Deserialize)]
struct InboundFrame {
    #[serde(default)]
    id: Option<u64>,
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// WebSocket-backed [`EventChannel`].
///
/// Opened once per session. When the connection drops, the event stream
/// ends and pending ack futures resolve as lost; reconnecting means opening
/// a fresh channel.
pub struct SocketChannel {
    local_user: UserId,
    outbound: mpsc::UnboundedSender<String>,
    pending_acks: Mutex<HashMap<u64, oneshot::Sender<SendAck>>>,
    next_frame_id: AtomicU64,
}

impl SocketChannel {
    /// Connect to the channel endpoint, keying the connection to the local
    /// user, and spawn the reader and writer tasks.
    pub async fn connect(url: &str, local_user: UserId) -> Result<(Arc<Self>, EventStream)> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}user_id={}", url, separator, local_user);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::Channel(format!("connect failed: {}", e)))?;
        tracing::info!(user = %local_user, "event channel connected");

        let (mut write, mut read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let channel = Arc::new(Self {
            local_user,
            outbound: out_tx,
            pending_acks: Mutex::new(HashMap::new()),
            next_frame_id: AtomicU64::new(1),
        });

        // Writer: queued frames plus periodic pings.
        tokio::spawn(async move {
            let mut ping = tokio::time::interval(PING_INTERVAL);
            ping.tick().await;

            loop {
                tokio::select! {
                    maybe = out_rx.recv() => match maybe {
                        Some(text) => {
                            if let Err(e) = write.send(WsMessage::Text(text.into())).await {
                                tracing::warn!(error = %e, "channel write failed");
                                break;
                            }
                        }
                        None => {
                            let _ = write.send(WsMessage::Close(None)).await;
                            break;
                        }
                    },
                    _ = ping.tick() => {
                        if write.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // Reader: route acks to their oneshots, everything else to the
        // event stream.
        let reader = channel.clone();
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => reader.route_frame(text.as_str(), &in_tx).await,
                    Ok(WsMessage::Close(_)) => {
                        tracing::info!("event channel closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "event channel read failed");
                        break;
                    }
                }
            }
            // Unresolved acks are lost with the connection.
            reader.pending_acks.lock().await.clear();
        });

        Ok((channel, in_rx))
    }

    async fn route_frame(&self, text: &str, events: &mpsc::UnboundedSender<ServerEvent>) {
        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame");
                return;
            }
        };

        if frame.event == "ack" {
            let Some(id) = frame.id else {
                tracing::warn!("dropping ack frame without id");
                return;
            };
            let ack: SendAck = match serde_json::from_value(frame.data) {
                Ok(ack) => ack,
                Err(e) => {
                    tracing::warn!(id, error = %e, "dropping malformed ack");
                    return;
                }
            };
            match self.pending_acks.lock().await.remove(&id) {
                Some(tx) => {
                    let _ = tx.send(ack);
                }
                None => tracing::debug!(id, "ack for unknown frame"),
            }
            return;
        }

        match ServerEvent::from_parts(&frame.event, frame.data) {
            Ok(event) => {
                let _ = events.send(event);
            }
            Err(e) => {
                tracing::warn!(event = %frame.event, error = %e, "dropping unrecognized event");
            }
        }
    }

    fn enqueue(&self, id: Option<u64>, event: &ClientEvent) -> Result<()> {
        let text = serde_json::to_string(&OutboundFrame { id, event })?;
        self.outbound
            .send(text)
            .map_err(|_| Error::Channel("event channel is closed".to_string()))
    }
}

#[async_trait]
impl EventChannel for SocketChannel {
    fn local_user(&self) -> &UserId {
        &self.local_user
    }

    async fn send_message(&self, receiver_id: &UserId, body: &str) -> Result<AckFuture> {
        let id = self.next_frame_id.fetch_add(1, Ordering::Relaxed);
        let (ack_tx, ack_rx) = oneshot::channel();
        self.pending_acks.lock().await.insert(id, ack_tx);

        let event = ClientEvent::SendMessage {
            receiver_id: receiver_id.clone(),
            message: body.to_string(),
        };
        if let Err(e) = self.enqueue(Some(id), &event) {
            self.pending_acks.lock().await.remove(&id);
            return Err(e);
        }
        Ok(ack_rx)
    }

    async fn send_typing(&self, to_id: &UserId, is_typing: bool) -> Result<()> {
        self.enqueue(
            None,
            &ClientEvent::Typing {
                to_id: to_id.clone(),
                is_typing,
            },
        )
    }

    async fn send_mark_seen(&self, other_id: &UserId) -> Result<()> {
        self.enqueue(
            None,
            &ClientEvent::MarkSeen {
                other_id: other_id.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_frame_shape() {
        let event = ClientEvent::SendMessage {
            receiver_id: "mentor-1".into(),
            message: "hello".to_string(),
        };
        let with_id = serde_json::to_value(OutboundFrame {
            id: Some(7),
            event: &event,
        })
        .unwrap();

        assert_eq!(with_id["id"], 7);
        assert_eq!(with_id["event"], "send_message");
        assert_eq!(with_id["data"]["receiver_id"], "mentor-1");

        let typing = ClientEvent::Typing {
            to_id: "mentor-1".into(),
            is_typing: true,
        };
        let without_id = serde_json::to_value(OutboundFrame {
            id: None,
            event: &typing,
        })
        .unwrap();
        assert!(without_id.get("id").is_none());
        assert_eq!(without_id["event"], "typing");
    }

    #[test]
    fn test_inbound_frame_parsing() {
        let parsed: InboundFrame =
            serde_json::from_str(r#"{"event":"ack","id":3,"data":{"ok":true}}"#).unwrap();
        assert_eq!(parsed.id, Some(3));
        assert_eq!(parsed.event, "ack");

        let bare: InboundFrame =
            serde_json::from_str(r#"{"event":"messages_seen","data":{"by":"m-1"}}"#).unwrap();
        assert_eq!(bare.id, None);
        assert_eq!(bare.event, "messages_seen");
    }
}
