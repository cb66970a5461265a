//! Event schemas for the bidirectional channel.
//!
//! Every event is JSON with a fixed tagged shape: `{"event": <name>,
//! "data": <payload>}`. Payloads are validated on receipt; anything that
//! does not decode into one of the variants below is dropped by the
//! transport with a log line, never surfaced as an error.

use crate::chat::types::{Message, UserId};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Events the client emits to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Ask the server to persist and fan out a message. Acknowledged with
    /// a [`SendAck`].
    SendMessage {
        /// Recipient's user ID.
        receiver_id: UserId,
        /// Message body.
        message: String,
    },

    /// Typing signal for the recipient. Fire and forget.
    Typing {
        /// Recipient's user ID.
        to_id: UserId,
        /// Whether the local user is composing.
        is_typing: bool,
    },

    /// Mark every message from the given user as seen. Fire and forget.
    MarkSeen {
        /// The other participant of the conversation.
        other_id: UserId,
    },
}

/// Events the server pushes to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Connection handshake result, keyed to the local user.
    Connected {
        /// Whether the server accepted the connection.
        ok: bool,
        /// The user the connection is keyed to.
        user_id: UserId,
    },

    /// A message row involving the local user. Includes echoes of the local
    /// user's own sends.
    NewMessage(Message),

    /// A counterpart started or stopped composing.
    TypingUpdate {
        /// Who is typing.
        from_id: UserId,
        /// Who the signal is for.
        to_id: UserId,
        /// Whether composing is in progress.
        is_typing: bool,
    },

    /// A counterpart read their copy of the conversation.
    MessagesSeen {
        /// Who read the messages.
        by: UserId,
    },
}

impl ClientEvent {
    /// Encode to a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a JSON text frame.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerEvent {
    /// Encode to a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a JSON text frame.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode from an already-split frame (event name plus payload value).
    pub fn from_parts(event: &str, data: serde_json::Value) -> Result<Self> {
        let tagged = serde_json::json!({ "event": event, "data": data });
        Ok(serde_json::from_value(tagged)?)
    }
}

/// Single-shot acknowledgment of one `send_message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendAck {
    /// Whether the server persisted the message.
    pub ok: bool,
    /// Server-reported failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendAck {
    /// An acknowledgment reporting success.
    pub fn accepted() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    /// An acknowledgment carrying a server error.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_client_event_tags() {
        let event = ClientEvent::SendMessage {
            receiver_id: "mentor-1".into(),
            message: "hello".to_string(),
        };
        let json = event.encode().unwrap();
        assert!(json.contains("\"event\":\"send_message\""));
        assert!(json.contains("\"receiver_id\":\"mentor-1\""));
        assert!(json.contains("\"message\":\"hello\""));

        let typing = ClientEvent::Typing {
            to_id: "mentor-1".into(),
            is_typing: true,
        };
        assert!(typing.encode().unwrap().contains("\"event\":\"typing\""));

        let seen = ClientEvent::MarkSeen {
            other_id: "mentor-1".into(),
        };
        assert!(seen.encode().unwrap().contains("\"event\":\"mark_seen\""));
    }

    #[test]
    fn test_client_event_roundtrip() {
        let event = ClientEvent::Typing {
            to_id: "mentor-1".into(),
            is_typing: false,
        };
        let decoded = ClientEvent::decode(&event.encode().unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_server_event_new_message() {
        let json = r#"{
            "event": "new_message",
            "data": {
                "sender_id": "student-3",
                "receiver_id": "mentor-1",
                "message": "question about recursion",
                "created_at": "2025-03-14T09:26:53Z"
            }
        }"#;

        match ServerEvent::decode(json).unwrap() {
            ServerEvent::NewMessage(msg) => {
                assert_eq!(msg.sender_id.as_str(), "student-3");
                assert_eq!(msg.body, "question about recursion");
                assert_eq!(
                    msg.created_at,
                    Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
                );
            }
            other => panic!("wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_server_event_connected() {
        let json = r#"{"event":"connected","data":{"ok":true,"user_id":"student-3"}}"#;
        match ServerEvent::decode(json).unwrap() {
            ServerEvent::Connected { ok, user_id } => {
                assert!(ok);
                assert_eq!(user_id.as_str(), "student-3");
            }
            other => panic!("wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_server_event_from_parts() {
        let data = serde_json::json!({ "by": "mentor-1" });
        match ServerEvent::from_parts("messages_seen", data).unwrap() {
            ServerEvent::MessagesSeen { by } => assert_eq!(by.as_str(), "mentor-1"),
            other => panic!("wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_an_error() {
        assert!(ServerEvent::decode(r#"{"event":"presence_blast","data":{}}"#).is_err());
        assert!(ServerEvent::from_parts("presence_blast", serde_json::json!({})).is_err());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        // Right tag, wrong payload shape.
        let json = r#"{"event":"typing_update","data":{"from_id":7}}"#;
        assert!(ServerEvent::decode(json).is_err());
    }

    #[test]
    fn test_send_ack_shapes() {
        let ok: SendAck = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(ok.ok);
        assert!(ok.error.is_none());

        let err: SendAck = serde_json::from_str(r#"{"ok":false,"error":"Not authorized"}"#).unwrap();
        assert!(!err.ok);
        assert_eq!(err.error.as_deref(), Some("Not authorized"));

        assert_eq!(SendAck::rejected("x").error.as_deref(), Some("x"));
        assert!(SendAck::accepted().ok);
    }
}
