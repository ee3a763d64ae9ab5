//! Wire envelope for tunnel frames (§3 "Message (tunnel frame)", §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frame kind (§4.9 "Protocol").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Handshake,
    Ping,
    Pong,
    Close,
    Resource,
    Status,
    Event,
    Command,
}

/// A single tunnel frame: `{id, type, timestamp, payload, error?}` (§3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique per-frame identifier; request/response pairs share one.
    pub id: String,
    #[serde(rename = "type")]
    pub type_: MessageType,
    /// RFC3339 timestamp the frame was constructed.
    pub timestamp: DateTime<Utc>,
    /// Domain payload; schema depends on `type_` (§3).
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Set on a frame reporting a failure instead of a result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Message {
    /// Build a frame with a fresh id and the current timestamp.
    pub fn new(type_: MessageType, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            type_,
            timestamp: Utc::now(),
            payload,
            error: None,
        }
    }

    /// Application-level keep-alive (§4.9 "Keep-alive").
    pub fn ping() -> Self {
        Self::new(MessageType::Ping, serde_json::Value::Null)
    }

    /// Reply to a received [`MessageType::Ping`].
    pub fn pong() -> Self {
        Self::new(MessageType::Pong, serde_json::Value::Null)
    }

    /// Either side may send this to begin a close handshake (§4.9 "Close").
    pub fn close() -> Self {
        Self::new(MessageType::Close, serde_json::Value::Null)
    }

    /// First message after dial (§4.9 "Handshake").
    pub fn handshake(
        sync_target: impl Into<String>,
        version: impl Into<String>,
        capabilities: Vec<String>,
        token: Option<String>,
    ) -> Self {
        Self::new(
            MessageType::Handshake,
            serde_json::json!({
                "syncTarget": sync_target.into(),
                "version": version.into(),
                "capabilities": capabilities,
                "token": token,
            }),
        )
    }

    /// A frame reporting `error` in answer to a request of the same `id`.
    pub fn error_reply(request_id: impl Into<String>, type_: MessageType, error: impl Into<String>) -> Self {
        Self {
            id: request_id.into(),
            type_,
            timestamp: Utc::now(),
            payload: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }

    /// True if this frame carries an `error`.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_pong_round_trip_through_json() {
        let ping = Message::ping();
        let encoded = serde_json::to_string(&ping).unwrap();
        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.type_, MessageType::Ping);
        assert!(!decoded.is_error());
    }

    #[test]
    fn handshake_carries_sync_target_and_capabilities() {
        let msg = Message::handshake("cluster-a", "v1", vec!["pods".to_string()], Some("tok".to_string()));
        assert_eq!(msg.payload["syncTarget"], "cluster-a");
        assert_eq!(msg.payload["capabilities"][0], "pods");
    }

    #[test]
    fn error_reply_preserves_request_id() {
        let reply = Message::error_reply("req-1", MessageType::Handshake, "denied");
        assert_eq!(reply.id, "req-1");
        assert_eq!(reply.error.as_deref(), Some("denied"));
    }
}
