//! JSON encode/decode between [`Message`] and the WebSocket frame type (§6
//! "Tunnel frames (wire)").

use crate::error::{Result, TunnelError};
use crate::message::Message;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Encode a frame as a text WebSocket message.
pub fn encode(message: &Message) -> Result<WsMessage> {
    let text = serde_json::to_string(message)?;
    Ok(WsMessage::text(text))
}

/// Decode an inbound WebSocket message into a [`Message`]. Control frames
/// (ping/pong/close at the transport layer, per §4.9 "the underlying frame
/// layer may additionally use its own ping frames") decode to `None`.
pub fn decode(frame: WsMessage) -> Result<Option<Message>> {
    match frame {
        WsMessage::Text(text) => Ok(Some(serde_json::from_str(&text)?)),
        WsMessage::Binary(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;

    #[test]
    fn encode_then_decode_preserves_type_and_payload() {
        let original = Message::handshake("c1", "v1", vec![], None);
        let frame = encode(&original).unwrap();
        let decoded = decode(frame).unwrap().unwrap();
        assert_eq!(decoded.type_, MessageType::Handshake);
        assert_eq!(decoded.payload, original.payload);
    }

    #[test]
    fn transport_ping_frame_decodes_to_none() {
        let frame = WsMessage::Ping(Vec::new().into());
        assert!(decode(frame).unwrap().is_none());
    }
}
