//! Reconciler, work queue, conflict resolver, status aggregator and update
//! applier for the Upstream Sync Engine.
//!
//! Plays the role `kube_runtime` plays for `kube`: the stateful control-loop
//! machinery built on top of the plain data types in `syncer-core`.

pub mod aggregator;
pub mod applier;
pub mod conflict;
pub mod error;
pub mod gated;
pub mod queue;
pub mod reconciler;
pub mod status_tracker;

pub use aggregator::{AggregatedStatus, ResourceStatus, StatusAggregator};
pub use applier::{ApplyError, ApplyOutcome, Update, UpdateApplier, UpdateType};
pub use conflict::{Conflict, ConflictResolver, ConflictType, Resolution, Severity, Strategy};
pub use error::ReconcileError;
pub use gated::{build_aggregating, build_conflict_resolving, Aggregating, ConflictResolving, NoopAggregator, NoopConflictResolver};
pub use queue::{Action, WorkItem, WorkQueue};
pub use reconciler::{Reconciler, ReconcilerConfig};
pub use status_tracker::{StatusTracker, TargetStatus};
