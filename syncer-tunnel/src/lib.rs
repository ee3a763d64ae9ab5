//! Reconnecting framed WebSocket tunnel to a remote syncer agent (§4.9).

pub mod codec;
pub mod error;
pub mod manager;
pub mod message;
pub mod reconnector;

pub use error::TunnelError;
pub use manager::{Handler, TunnelManager, TunnelManagerConfig};
pub use message::{Message, MessageType};
pub use reconnector::{BackoffReconnector, Reconnector};
