//! Feature gates and the real/no-op factory pattern (§6 "Feature gates",
//! §9 "Feature-gated polymorphism", §7 "Feature-gate disabled").
//!
//! Instead of inheritance or runtime reflection, every gated capability
//! gets two concrete implementations — real and no-op — selected once at
//! process start by a factory. No downcasting is needed afterwards.

use serde::{Deserialize, Serialize};

/// The three boolean gates named in §6.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeatureGates {
    /// Master switch for the upstream sync loop.
    pub upstream_sync: bool,
    /// Enables [`crate`]-level status aggregation.
    pub upstream_sync_aggregation: bool,
    /// Enables conflict resolution (vs. always taking physical as-is).
    pub upstream_sync_conflict_resolution: bool,
}

impl FeatureGates {
    /// All gates on — the common case for a fully-enabled engine.
    pub fn all_enabled() -> Self {
        Self {
            upstream_sync: true,
            upstream_sync_aggregation: true,
            upstream_sync_conflict_resolution: true,
        }
    }

    /// All gates off — every factory built against this returns a no-op.
    pub fn all_disabled() -> Self {
        Self::default()
    }
}

/// Common readiness probe every gated capability, real or no-op, exposes.
pub trait Gated {
    /// `false` for every no-op implementation (§7 "Feature-gate disabled": `IsReady=false`).
    fn is_ready(&self) -> bool;
}
