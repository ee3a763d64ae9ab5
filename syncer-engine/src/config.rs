//! Process configuration surface (§6 "Configuration surface").

use clap::Parser;
use std::time::Duration;

/// Top-level CLI configuration for the `syncer-engine` binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub reconciler: ReconcilerArgs,

    #[command(flatten)]
    pub tunnel: TunnelArgs,

    #[command(flatten)]
    pub gates: FeatureGateArgs,

    /// Address the SyncerEndpoint HTTP server binds to.
    #[arg(long, env = "SYNCER_LISTEN_ADDR", default_value = "0.0.0.0:8443")]
    pub listen_addr: String,
}

/// Reconciler tunables. `sync_interval_secs <= 0` and `num_workers <= 0`
/// fall back to their defaults rather than being rejected (§6).
#[derive(Parser, Debug, Clone)]
pub struct ReconcilerArgs {
    /// Periodic full-sweep interval, in seconds. `<= 0` means "use the default" (30s).
    #[arg(long, env = "SYNCER_SYNC_INTERVAL_SECS", default_value_t = 30)]
    pub sync_interval_secs: i64,

    /// Worker task count, range 2-5. `<= 0` means "use the default" (2).
    #[arg(long, env = "SYNCER_NUM_WORKERS", default_value_t = 2)]
    pub num_workers: i64,

    /// Cap on per-item retries before it's Forgot.
    #[arg(long, env = "SYNCER_MAX_RETRIES", default_value_t = 5)]
    pub max_retries: u32,

    /// How often a stale DiscoveryCache is allowed to go before refresh is due, in seconds.
    #[arg(long, env = "SYNCER_DISCOVERY_REFRESH_SECS", default_value_t = 300)]
    pub discovery_refresh_secs: u64,

    /// Per-entry TTL for each SyncTarget's DiscoveryCache, in seconds.
    #[arg(long, env = "SYNCER_DISCOVERY_CACHE_TTL_SECS", default_value_t = 300)]
    pub discovery_cache_ttl_secs: u64,

    /// Conflict/aggregation history ring-buffer bound.
    #[arg(long, env = "SYNCER_CONFLICT_HISTORY_SIZE", default_value_t = 100)]
    pub conflict_history_size: usize,
}

impl ReconcilerArgs {
    pub fn to_runtime_config(&self) -> syncer_runtime::reconciler::ReconcilerConfig {
        let defaults = syncer_runtime::reconciler::ReconcilerConfig::default();
        syncer_runtime::reconciler::ReconcilerConfig {
            num_workers: if self.num_workers <= 0 { defaults.num_workers } else { self.num_workers as usize },
            max_retries: self.max_retries,
            sync_interval: if self.sync_interval_secs <= 0 {
                defaults.sync_interval
            } else {
                Duration::from_secs(self.sync_interval_secs as u64)
            },
            discovery_refresh_interval: Duration::from_secs(self.discovery_refresh_secs),
            discovery_cache_ttl: Duration::from_secs(self.discovery_cache_ttl_secs),
            history_size: self.conflict_history_size,
        }
    }
}

/// Tunnel manager tunables (§4.9 defaults).
#[derive(Parser, Debug, Clone)]
pub struct TunnelArgs {
    /// WebSocket URL of the remote syncer agent to dial.
    #[arg(long, env = "SYNCER_TUNNEL_URL")]
    pub tunnel_url: Option<String>,

    /// Handshake response timeout, in seconds.
    #[arg(long, env = "SYNCER_HANDSHAKE_TIMEOUT_SECS", default_value_t = 10)]
    pub handshake_timeout_secs: u64,

    /// Outbound send timeout, in seconds.
    #[arg(long, env = "SYNCER_SEND_TIMEOUT_SECS", default_value_t = 5)]
    pub send_timeout_secs: u64,

    /// Idle-read timeout before a connection is considered dead, in seconds.
    #[arg(long, env = "SYNCER_READ_IDLE_SECS", default_value_t = 60)]
    pub read_idle_secs: u64,

    /// Consecutive-failure threshold before the reconnect circuit breaker opens.
    #[arg(long, env = "SYNCER_CIRCUIT_BREAKER_THRESHOLD", default_value_t = 5)]
    pub circuit_breaker_threshold: u32,
}

/// Feature gate switches (§6 "Feature gates").
#[derive(Parser, Debug, Clone)]
pub struct FeatureGateArgs {
    #[arg(long, env = "SYNCER_GATE_UPSTREAM_SYNC", default_value_t = true)]
    pub upstream_sync: bool,

    #[arg(long, env = "SYNCER_GATE_AGGREGATION", default_value_t = true)]
    pub upstream_sync_aggregation: bool,

    #[arg(long, env = "SYNCER_GATE_CONFLICT_RESOLUTION", default_value_t = true)]
    pub upstream_sync_conflict_resolution: bool,
}

impl From<&FeatureGateArgs> for syncer_core::feature_gate::FeatureGates {
    fn from(args: &FeatureGateArgs) -> Self {
        Self {
            upstream_sync: args.upstream_sync,
            upstream_sync_aggregation: args.upstream_sync_aggregation,
            upstream_sync_conflict_resolution: args.upstream_sync_conflict_resolution,
        }
    }
}
