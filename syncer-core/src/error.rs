//! Error types shared across the data model, namespace mapping and
//! resource transformation.

use thiserror::Error;

/// Errors raised by [`crate::namespace::NamespaceMapper`],
/// [`crate::transform::ResourceTransformer`], [`crate::discovery::DiscoveryCache`]
/// and [`crate::uid::UidMapping`].
#[derive(Debug, Error)]
pub enum Error {
    /// A namespace failed [`crate::namespace::NamespaceMapper::validate`].
    #[error("invalid namespace {0:?}")]
    InvalidNamespace(String),

    /// `toPhysical` was called on a string that is not a logical namespace
    /// for the given SyncTarget.
    #[error("{namespace:?} is not a logical namespace for sync target {sync_target:?}")]
    NotLogicalNamespace {
        /// The string that failed to resolve.
        namespace: String,
        /// The SyncTarget it was checked against.
        sync_target: String,
    },

    /// `transformFromPhysical`/`transformToPhysical` was called with a null object.
    #[error("cannot transform a null object")]
    NilObject,

    /// A UID already maps to a different UID than the one being inserted.
    #[error("uid {uid} is already mapped to {existing}, refusing to remap to {attempted}")]
    UidConflict {
        /// The UID whose mapping was violated.
        uid: String,
        /// The UID it currently maps to.
        existing: String,
        /// The UID the caller tried to map it to instead.
        attempted: String,
    },

    /// The resolver/aggregator capability is disabled by a feature gate and has
    /// no sensible no-op for the requested operation.
    #[error("{0} is disabled by feature gate")]
    Disabled(&'static str),

    /// `StatusAggregator::aggregate` was called with an empty slice.
    #[error("aggregate called with no ResourceStatus entries")]
    EmptyInput,
}

/// Convenience alias used throughout `syncer-core`.
pub type Result<T> = std::result::Result<T, Error>;
