//! Maintains at most one live duplex framed connection to a remote peer,
//! reconnecting through an external [`Reconnector`] on failure (§4.9).

use crate::codec;
use crate::error::{Result, TunnelError};
use crate::message::{Message, MessageType};
use crate::reconnector::Reconnector;
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A callback invoked once per inbound frame of its registered type.
pub type Handler = Arc<dyn Fn(Message) + Send + Sync>;

const CHANNEL_CAPACITY: usize = 100;

/// Tunables (§4.9, §6 "Configuration surface").
#[derive(Debug, Clone)]
pub struct TunnelManagerConfig {
    /// WebSocket URL to dial.
    pub url: String,
    /// This end's SyncTarget identity, sent in the handshake.
    pub sync_target: String,
    /// Protocol version string sent in the handshake.
    pub version: String,
    /// Capability list sent in the handshake.
    pub capabilities: Vec<String>,
    /// Optional bearer token sent in the handshake.
    pub token: Option<String>,
    /// Handshake deadline (default 10s).
    pub handshake_timeout: Duration,
    /// Outbound non-blocking send deadline (default 5s).
    pub send_timeout: Duration,
    /// Read-idle deadline; no frame within this window is treated as a dead connection (default 60s).
    pub read_idle_timeout: Duration,
    /// Application-level ping cadence (default 30s).
    pub ping_interval: Duration,
    /// How long `close` waits for the background tasks to finish (default 10s).
    pub close_timeout: Duration,
}

impl TunnelManagerConfig {
    /// Build a config with the §6 configuration-surface defaults.
    pub fn new(url: impl Into<String>, sync_target: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sync_target: sync_target.into(),
            version: "v1".to_string(),
            capabilities: Vec::new(),
            token: None,
            handshake_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(5),
            read_idle_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
            close_timeout: Duration::from_secs(10),
        }
    }
}

/// Drives one reconnecting tunnel (§4.9). Always constructed behind an
/// `Arc` since its background tasks hold clones of it.
pub struct TunnelManager {
    config: TunnelManagerConfig,
    reconnector: Arc<dyn Reconnector>,
    outbound_tx: mpsc::Sender<Message>,
    outbound_rx: tokio::sync::Mutex<mpsc::Receiver<Message>>,
    handlers: RwLock<HashMap<MessageType, Handler>>,
    cancel: CancellationToken,
    connected: AtomicBool,
    close_once: Mutex<bool>,
    run_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TunnelManager {
    /// Build a manager. Call [`Self::run`] to start the reconnect loop.
    pub fn new(config: TunnelManagerConfig, reconnector: Arc<dyn Reconnector>) -> Arc<Self> {
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        Arc::new(Self {
            config,
            reconnector,
            outbound_tx,
            outbound_rx: tokio::sync::Mutex::new(outbound_rx),
            handlers: RwLock::new(HashMap::new()),
            cancel: CancellationToken::new(),
            connected: AtomicBool::new(false),
            close_once: Mutex::new(false),
            run_handle: Mutex::new(None),
        })
    }

    /// Register (or replace) the handler invoked for every inbound frame of `type_`
    /// (§4.9 "a dispatcher goroutine invokes registered handlers per frame type").
    pub fn on(&self, type_: MessageType, handler: Handler) {
        self.handlers.write().insert(type_, handler);
    }

    /// True once a handshake has completed and no failure has been observed since.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Enqueue `message` for the writer task. Non-blocking with a `sendTimeout`
    /// bound (§4.9 "Outbound send is non-blocking with a 5 s timeout").
    pub async fn send(&self, message: Message) -> Result<()> {
        match timeout(self.config.send_timeout, self.outbound_tx.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(TunnelError::Closed),
            Err(_) => Err(TunnelError::SendTimeout(self.config.send_timeout)),
        }
    }

    /// Start the reconnect loop in the background.
    pub fn run(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.reconnect_loop().await });
        *self.run_handle.lock() = Some(handle);
    }

    /// Idempotent shutdown (§4.9 "Close semantics"): cancels the manager's
    /// context, and waits up to `close_timeout` for the background tasks.
    /// A timeout is reported but does not leak the tasks indefinitely — they
    /// observe `cancel` independently and exit on their own.
    pub async fn close(self: &Arc<Self>) -> Result<()> {
        {
            let mut closed = self.close_once.lock();
            if *closed {
                return Ok(());
            }
            *closed = true;
        }
        self.cancel.cancel();

        let handle = self.run_handle.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };
        match timeout(self.config.close_timeout, handle).await {
            Ok(_) => Ok(()),
            Err(_) => {
                warn!("tunnel manager close timed out waiting for background tasks");
                Err(TunnelError::CloseTimeout(self.config.close_timeout))
            }
        }
    }

    async fn reconnect_loop(self: Arc<Self>) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }

            match self.connect_once().await {
                Ok(()) => {
                    debug!("tunnel connection ended cleanly");
                }
                Err(e) => {
                    warn!(error = %e, "tunnel connection failed");
                }
            }
            self.connected.store(false, Ordering::Relaxed);

            if self.cancel.is_cancelled() {
                return;
            }

            self.reconnector.record_failure();
            if !self.reconnector.should_retry() || self.reconnector.is_circuit_open() {
                error!("tunnel reconnector circuit open, giving up");
                return;
            }
            let Some(delay) = self.reconnector.next_delay() else {
                error!("tunnel reconnector backoff exhausted, giving up");
                return;
            };
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect_once(self: &Arc<Self>) -> Result<()> {
        let (ws_stream, _) = connect_async(&self.config.url)
            .await
            .map_err(|e| TunnelError::Dial(e.to_string()))?;
        let (mut sink, mut stream) = ws_stream.split();

        let handshake = Message::handshake(
            self.config.sync_target.clone(),
            self.config.version.clone(),
            self.config.capabilities.clone(),
            self.config.token.clone(),
        );
        sink.send(codec::encode(&handshake)?).await?;

        let response = timeout(self.config.handshake_timeout, stream.next())
            .await
            .map_err(|_| TunnelError::HandshakeTimeout(self.config.handshake_timeout))?
            .ok_or_else(|| TunnelError::Handshake("connection closed before handshake response".to_string()))?
            .map_err(TunnelError::WebSocket)?;
        let response = codec::decode(response)?
            .ok_or_else(|| TunnelError::Handshake("non-data frame during handshake".to_string()))?;
        if response.type_ != MessageType::Handshake {
            return Err(TunnelError::Handshake(format!("expected Handshake, got {:?}", response.type_)));
        }
        if let Some(err) = response.error {
            return Err(TunnelError::Handshake(err));
        }

        self.connected.store(true, Ordering::Relaxed);
        self.reconnector.record_success();
        info!(sync_target = %self.config.sync_target, "tunnel handshake complete");

        let (inbound_tx, inbound_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);

        let mut reader = tokio::spawn(Self::reader_task(
            Arc::clone(self),
            stream,
            inbound_tx,
            self.config.read_idle_timeout,
        ));
        let mut writer = tokio::spawn(Self::writer_task(Arc::clone(self), sink, self.config.ping_interval));
        let mut dispatcher = tokio::spawn(Self::dispatcher_task(Arc::clone(self), inbound_rx));

        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = &mut reader => {}
            _ = &mut writer => {}
            _ = &mut dispatcher => {}
        }
        reader.abort();
        writer.abort();
        dispatcher.abort();

        Ok(())
    }

    async fn reader_task(
        this: Arc<Self>,
        mut stream: futures::stream::SplitStream<
            tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        >,
        inbound_tx: mpsc::Sender<Message>,
        read_idle_timeout: Duration,
    ) {
        loop {
            let next = tokio::select! {
                _ = this.cancel.cancelled() => return,
                next = timeout(read_idle_timeout, stream.next()) => next,
            };
            let Ok(frame) = next else {
                warn!("tunnel read idle timeout");
                return;
            };
            let Some(frame) = frame else {
                debug!("tunnel peer closed the connection");
                return;
            };
            let frame = match frame {
                Ok(f) => f,
                Err(e) => {
                    warn!(error = %e, "tunnel read error");
                    return;
                }
            };
            match codec::decode(frame) {
                Ok(Some(message)) => {
                    if inbound_tx.send(message).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "tunnel frame decode error");
                    return;
                }
            }
        }
    }

    async fn writer_task(
        this: Arc<Self>,
        mut sink: futures::stream::SplitSink<
            tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
            tokio_tungstenite::tungstenite::Message,
        >,
        ping_interval: Duration,
    ) {
        let mut rx = this.outbound_rx.lock().await;
        let mut ping_timer = tokio::time::interval(ping_interval);
        ping_timer.tick().await; // first tick fires immediately; consume it

        loop {
            tokio::select! {
                _ = this.cancel.cancelled() => return,
                _ = ping_timer.tick() => {
                    let frame = match codec::encode(&Message::ping()) {
                        Ok(f) => f,
                        Err(e) => { warn!(error = %e, "ping encode failed"); continue; }
                    };
                    if sink.send(frame).await.is_err() {
                        return;
                    }
                }
                maybe_msg = rx.recv() => {
                    let Some(message) = maybe_msg else { return; };
                    let frame = match codec::encode(&message) {
                        Ok(f) => f,
                        Err(e) => { warn!(error = %e, "outbound frame encode failed"); continue; }
                    };
                    if sink.send(frame).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    async fn dispatcher_task(this: Arc<Self>, mut inbound_rx: mpsc::Receiver<Message>) {
        loop {
            let message = tokio::select! {
                _ = this.cancel.cancelled() => return,
                message = inbound_rx.recv() => message,
            };
            let Some(message) = message else { return };

            if message.type_ == MessageType::Ping {
                let _ = this.send(Message::pong()).await;
                continue;
            }

            let handler = this.handlers.read().get(&message.type_).cloned();
            if let Some(handler) = handler {
                handler(message);
            }
        }
    }
}
