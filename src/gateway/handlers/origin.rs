//! `GET /origin/{resource_path}` — the streaming gateway's origin endpoint.
//!
//! Verifies the capability, then either rewrites a manifest or streams
//! media bytes. Never caches; every request re-verifies and hits the
//! object store.

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::state::GatewayState;
use crate::metrics;
use crate::playlist::rewrite_playlist;
use crate::storage::StorageError;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

const ROUTE: &str = "origin";

pub async fn serve_resource(
    Path(resource_path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<GatewayState>,
) -> Response {
    let start = Instant::now();
    let result = serve_resource_inner(resource_path, params, state).await;
    let status = match &result {
        Ok(resp) => resp.status().as_u16(),
        Err(e) => status_of(e).as_u16(),
    };
    metrics::record_request(ROUTE, status);
    metrics::record_duration(ROUTE, start);
    match result {
        Ok(resp) => resp,
        Err(e) => e.into_response(),
    }
}

fn status_of(e: &GatewayError) -> StatusCode {
    match e {
        GatewayError::CapabilityInvalid(_) => StatusCode::FORBIDDEN,
        GatewayError::ResourceAbsent(_) => StatusCode::NOT_FOUND,
        GatewayError::StorageFailure(_) => StatusCode::BAD_GATEWAY,
        GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
    }
}

async fn serve_resource_inner(
    resource_path: String,
    params: HashMap<String, String>,
    state: GatewayState,
) -> GatewayResult<Response> {
    let signature = params
        .get("sig")
        .ok_or_else(|| GatewayError::CapabilityInvalid("missing signature parameters".into()))?;
    let expires_raw = params
        .get("exp")
        .ok_or_else(|| GatewayError::CapabilityInvalid("missing signature parameters".into()))?;
    let expires_at: i64 = expires_raw
        .parse()
        .map_err(|_| GatewayError::CapabilityInvalid("invalid expiration value".into()))?;

    let signed_path = format!("/{resource_path}");
    if !state.signer.verify(&signed_path, expires_at, signature) {
        warn!(resource = %signed_path, "signature verification failed");
        return Err(GatewayError::CapabilityInvalid(
            "signature verification failed".into(),
        ));
    }

    if resource_path.ends_with(".m3u8") {
        serve_playlist(&resource_path, &signed_path, &state).await
    } else {
        serve_binary(&resource_path, &state).await
    }
}

async fn serve_playlist(
    resource_path: &str,
    signed_path: &str,
    state: &GatewayState,
) -> GatewayResult<Response> {
    let body = state
        .storage
        .read_text(resource_path)
        .await
        .map_err(map_storage_error)?;

    let ttl = state.config.ttl_policy();
    let rewritten = rewrite_playlist(&body, signed_path, &state.signer, &ttl);

    info!(resource = %signed_path, "served playlist");
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
        rewritten,
    )
        .into_response())
}

async fn serve_binary(resource_path: &str, state: &GatewayState) -> GatewayResult<Response> {
    let media_type = guess_media_type(resource_path);
    let stream = state
        .storage
        .stream(resource_path, 64 * 1024)
        .await
        .map_err(map_storage_error)?;

    info!(resource = %resource_path, "streaming binary resource");
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, media_type)],
        Body::from_stream(stream),
    )
        .into_response())
}

fn guess_media_type(path: &str) -> &'static str {
    if path.ends_with(".m4s") {
        "video/iso.segment"
    } else if path.ends_with(".mp4") {
        "video/mp4"
    } else if path.ends_with(".json") {
        "application/json"
    } else {
        "application/octet-stream"
    }
}

fn map_storage_error(e: StorageError) -> GatewayError {
    match e {
        StorageError::NotFound(key) => GatewayError::ResourceAbsent(key),
        StorageError::Backend(msg) => GatewayError::StorageFailure(msg),
    }
}
