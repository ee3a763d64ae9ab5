//! Errors the virtual-workspace endpoint reports (§4.8, §7 "Authorization denial").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum EndpointError {
    /// Authorization failed; `0` is the human-readable reason surfaced to the caller.
    #[error("denied: {0}")]
    Denied(String),

    /// The request path didn't match the syncer virtual-endpoint grammar.
    #[error("malformed syncer path")]
    MalformedPath,

    /// A resource type outside `supportedResourceTypes` was requested.
    #[error("unsupported resource type: {0}")]
    UnsupportedResourceType(String),

    #[error(transparent)]
    Core(#[from] syncer_core::error::Error),
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let status = match &self {
            EndpointError::Denied(_) | EndpointError::UnsupportedResourceType(_) => StatusCode::FORBIDDEN,
            EndpointError::MalformedPath => StatusCode::NOT_FOUND,
            EndpointError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::FORBIDDEN {
            warn!(reason = %self, "syncer request denied");
        }
        (status, self.to_string()).into_response()
    }
}
