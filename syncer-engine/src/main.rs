//! Upstream Sync Engine entrypoint: wires the reconciler, SyncerEndpoint
//! HTTP server and tunnel manager together and runs them to completion or
//! graceful shutdown.

mod adapters;
mod config;

use adapters::{shared_target_store, AlwaysValidCertificate, InMemoryClientFactory, InMemoryCommitter, InMemoryInformer, InformerBackedResolver};
use clap::Parser;
use config::Cli;
use std::sync::Arc;
use syncer_core::feature_gate::FeatureGates;
use syncer_endpoint::router::{router, AppState};
use syncer_endpoint::TransformerCache;
use syncer_runtime::reconciler::Reconciler;
use syncer_tunnel::{BackoffReconnector, TunnelManager, TunnelManagerConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let gates = FeatureGates::from(&cli.gates);
    info!(?gates, "feature gates resolved");

    let cancel = CancellationToken::new();

    let store = shared_target_store(Vec::new());
    let informer = InMemoryInformer::new(Arc::clone(&store));
    let committer = InMemoryCommitter::new(Arc::clone(&store));
    let client_factory = InMemoryClientFactory::default();
    let kcp_client = adapters::InMemoryDynamicClient::default();

    let reconciler = Arc::new(Reconciler::new(
        informer,
        client_factory,
        kcp_client,
        committer,
        cli.reconciler.to_runtime_config(),
        gates,
    ));

    let mut handles = if gates.upstream_sync {
        reconciler.run(cancel.clone())
    } else {
        info!("upstreamSync gate disabled: reconciler loop not started");
        Vec::new()
    };

    let app_state = AppState {
        validator: Arc::new(AlwaysValidCertificate),
        resolver: Arc::new(InformerBackedResolver::new(Arc::clone(&store))),
        transformer_cache: Arc::new(TransformerCache::new()),
    };
    let app = router(app_state);
    let listener = tokio::net::TcpListener::bind(&cli.listen_addr).await?;
    info!(addr = %cli.listen_addr, "SyncerEndpoint listening");
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    let tunnel_manager = if let Some(url) = cli.tunnel.tunnel_url.clone() {
        let mut tunnel_config = TunnelManagerConfig::new(url, "syncer-engine".to_string());
        tunnel_config.handshake_timeout = std::time::Duration::from_secs(cli.tunnel.handshake_timeout_secs);
        tunnel_config.send_timeout = std::time::Duration::from_secs(cli.tunnel.send_timeout_secs);
        tunnel_config.read_idle_timeout = std::time::Duration::from_secs(cli.tunnel.read_idle_secs);
        let reconnector = Arc::new(BackoffReconnector::new(cli.tunnel.circuit_breaker_threshold));
        let manager = TunnelManager::new(tunnel_config, reconnector);
        manager.run();
        Some(manager)
    } else {
        info!("no tunnel URL configured, TunnelManager not started");
        None
    };

    wait_for_signal(cancel.clone()).await;

    for handle in handles.drain(..) {
        let _ = handle.await;
    }
    if let Some(manager) = tunnel_manager {
        manager.close().await.ok();
    }
    let _ = server_handle.await;

    Ok(())
}

/// Register Ctrl-C (SIGINT) and SIGTERM handling; cancel the engine on
/// first signal received (§5 "Cancellation & timeouts").
async fn wait_for_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to listen for SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!(signal = "SIGINT", "received signal, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                info!(signal = "SIGTERM", "received signal, initiating graceful shutdown");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("failed to listen for Ctrl-C");
        info!("received shutdown signal, initiating graceful shutdown");
    }
    cancel.cancel();
}
