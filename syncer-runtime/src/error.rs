//! Error types for the reconcile control loop.

use crate::applier::ApplyError;
use syncer_core::error::Error as CoreError;
use thiserror::Error;

/// Errors a single [`crate::reconciler::Reconciler`] processing pass can
/// report (§4.7 "Retry policy").
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The informer no longer knows about this SyncTarget; treated as a delete.
    #[error("sync target {0} not found")]
    NotFound(String),

    /// The informer itself failed to answer.
    #[error("informer error: {0}")]
    Informer(String),

    /// Obtaining/establishing the physical cluster client failed (§4.7 step 4).
    #[error("could not establish physical client: {0}")]
    PhysicalClient(String),

    /// A transform, namespace mapping or discovery-cache operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The dynamic resource client rejected a read or write.
    #[error(transparent)]
    Client(#[from] syncer_core::contracts::ClientError),

    /// `UpdateApplier::apply` failed.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// Persisting the status diff via `commit` failed.
    #[error("commit failed: {0}")]
    Commit(String),
}
