//! Per-request authorization for the virtual-workspace endpoint (§4.8
//! "Authorization steps for every request").

use crate::error::EndpointError;
use crate::path::ParsedPath;
use std::sync::Arc;
use syncer_core::contracts::{CertificateValidator, SyncTargetResolver};
use syncer_core::sync_target::SyncTarget;

/// The identity/path facts recovered for one inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// `(syncerID, workspace, remainder)`, already parsed by [`crate::path::parse`].
    pub path: ParsedPath,
    /// The caller's asserted user name (certificate CN or equivalent).
    pub user_name: String,
    /// The resource plural this request targets, e.g. `"pods"`. `None` for
    /// requests (like SyncTarget list/get/watch) that aren't resource-scoped.
    pub resource_plural: Option<String>,
}

/// Runs the five authorization steps in §4.8 and returns the resolved
/// SyncTarget on success.
pub async fn authorize(
    ctx: &RequestContext,
    validator: &Arc<dyn CertificateValidator>,
    resolver: &Arc<dyn SyncTargetResolver>,
) -> Result<SyncTarget, EndpointError> {
    // Step 1: recover (syncerID, workspace); the path parser already
    // rejected empty captures, so an empty field here means the context
    // was constructed incorrectly upstream.
    if ctx.path.syncer_id.is_empty() || ctx.path.workspace.is_empty() {
        return Err(EndpointError::Denied("missing syncer identity or workspace".to_string()));
    }

    // Step 2: username must equal system:syncer:<syncerID>; certificate
    // validation itself is delegated to the external contract.
    let expected_user = format!("system:syncer:{}", ctx.path.syncer_id);
    if ctx.user_name != expected_user {
        return Err(EndpointError::Denied(format!(
            "user {} does not match expected identity {expected_user}",
            ctx.user_name
        )));
    }
    validator
        .validate_certificate(&ctx.user_name)
        .await
        .map_err(|e| EndpointError::Denied(e.to_string()))?;

    // Step 3: resolve the SyncTarget this syncer is authorized to act as.
    let sync_target = resolver
        .get_sync_target_for_syncer(&ctx.path.syncer_id, &ctx.path.workspace)
        .await
        .map_err(|e| EndpointError::Denied(e.to_string()))?
        .ok_or_else(|| EndpointError::Denied(format!("no sync target for syncer {}", ctx.path.syncer_id)))?;

    // Step 4: the requested resource plural must be declared supported.
    if let Some(plural) = &ctx.resource_plural {
        let qualified = plural.clone();
        if !sync_target.spec.supported_resource_types.is_empty() && !sync_target.spec.supports(plural, &qualified) {
            return Err(EndpointError::UnsupportedResourceType(plural.clone()));
        }
    }

    // Step 5: allow.
    Ok(sync_target)
}
