//! Errors [`crate::manager::TunnelManager`] and [`crate::codec`] report.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("dial failed: {0}")]
    Dial(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("send timed out after {0:?}")]
    SendTimeout(Duration),

    #[error("close did not complete within {0:?}")]
    CloseTimeout(Duration),

    #[error("reconnector circuit is open")]
    CircuitOpen,

    #[error("tunnel is closed")]
    Closed,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("frame codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TunnelError>;
