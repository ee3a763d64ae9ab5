//! REST surface exposed to remote syncers: list/get/watch on SyncTargets,
//! plus filtered API discovery (§4.8, §6).

use crate::auth::{authorize, RequestContext};
use crate::discovery::{discover_core_resources, discover_groups, discover_workload_resources};
use crate::error::EndpointError;
use crate::path;
use crate::transformer_cache::TransformerCache;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::{self, Stream};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use syncer_core::contracts::{CertificateValidator, SyncTargetResolver};

/// Shared state for every handler below.
#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<dyn CertificateValidator>,
    pub resolver: Arc<dyn SyncTargetResolver>,
    pub transformer_cache: Arc<TransformerCache>,
}

/// Build the router: discovery endpoints plus SyncTarget list/get/watch,
/// all under the `/services/syncer/{syncer_id}/clusters/{workspace}` prefix (§4.8).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/services/syncer/{syncer_id}/clusters/{workspace}/apis", get(list_groups))
        .route("/services/syncer/{syncer_id}/clusters/{workspace}/api/v1", get(list_core_resources))
        .route(
            "/services/syncer/{syncer_id}/clusters/{workspace}/apis/workload.kcp.io/v1alpha1",
            get(list_workload_resources),
        )
        .route("/services/syncer/{syncer_id}/clusters/{workspace}/synctargets", get(list_sync_targets))
        .route("/services/syncer/{syncer_id}/clusters/{workspace}/synctargets/watch", get(watch_sync_targets))
        .route("/services/syncer/{syncer_id}/clusters/{workspace}/synctargets/{name}", get(get_sync_target))
        .with_state(state)
}

fn user_name(headers: &HeaderMap) -> String {
    headers
        .get("x-remote-user")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn authorize_request(
    state: &AppState,
    syncer_id: &str,
    workspace: &str,
    headers: &HeaderMap,
    resource_plural: Option<&str>,
) -> Result<syncer_core::sync_target::SyncTarget, EndpointError> {
    let full_path = format!("/services/syncer/{syncer_id}/clusters/{workspace}");
    let parsed = path::parse(&full_path).ok_or(EndpointError::MalformedPath)?;
    let ctx = RequestContext {
        path: parsed,
        user_name: user_name(headers),
        resource_plural: resource_plural.map(str::to_string),
    };
    authorize(&ctx, &state.validator, &state.resolver).await
}

/// Add the synthetic `syncer-id` annotation before a SyncTarget is returned
/// to its syncer (§4.8). `SyncTarget` carries no engine-owned annotations of
/// its own here — those live on the per-resource `Object`s `ResourceTransformer`
/// produces — so the prefix-stripping half of §4.8's filtering rule has
/// nothing to remove for this response shape.
fn sanitize_for_syncer(mut target: syncer_core::sync_target::SyncTarget, syncer_id: &str) -> serde_json::Value {
    target.status.conditions.clear();
    let mut value = serde_json::to_value(&target).unwrap_or(serde_json::Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("annotations".to_string(), json!({ "syncer-id": syncer_id }));
    }
    value
}

async fn list_groups(Path((syncer_id, workspace)): Path<(String, String)>, State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    match authorize_request(&state, &syncer_id, &workspace, &headers, None).await {
        Ok(target) => Json(discover_groups(&target.spec)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn list_core_resources(
    Path((syncer_id, workspace)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match authorize_request(&state, &syncer_id, &workspace, &headers, None).await {
        Ok(target) => Json(discover_core_resources(&target.spec)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn list_workload_resources(
    Path((syncer_id, workspace)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match authorize_request(&state, &syncer_id, &workspace, &headers, None).await {
        Ok(target) => Json(discover_workload_resources(&target.spec)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List always returns a list of length zero or one: the syncer's own
/// SyncTarget (§4.8 "REST surface").
async fn list_sync_targets(
    Path((syncer_id, workspace)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match authorize_request(&state, &syncer_id, &workspace, &headers, None).await {
        Ok(target) => Json(vec![sanitize_for_syncer(target, &syncer_id)]).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_sync_target(
    Path((syncer_id, workspace, name)): Path<(String, String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match authorize_request(&state, &syncer_id, &workspace, &headers, None).await {
        Ok(target) if target.name == name => Json(sanitize_for_syncer(target, &syncer_id)).into_response(),
        Ok(_) => EndpointError::Denied(format!("no such sync target: {name}")).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Watch returns a stream that may be empty but must not error on
/// establishment (§4.8). This implementation emits a single `Added` event
/// for the syncer's own SyncTarget (if authorized) and then idles.
async fn watch_sync_targets(
    Path((syncer_id, workspace)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let events: Vec<Result<Event, Infallible>> = match authorize_request(&state, &syncer_id, &workspace, &headers, None).await {
        Ok(target) => {
            let value = sanitize_for_syncer(target, &syncer_id);
            vec![Ok(Event::default().event("Added").json_data(value).unwrap_or_else(|_| Event::default()))]
        }
        Err(_) => Vec::new(),
    };
    let stream: std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> = Box::pin(stream::iter(events));
    Sse::new(stream)
}
