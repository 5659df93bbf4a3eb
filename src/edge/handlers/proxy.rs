//! `GET /origin/{resource_path}` — the CDN edge's cache-or-forward proxy.
//!
//! Cache lookups key off the full inbound URL (verbatim signatures and
//! all); origin forwarding preserves the query string untouched so the
//! gateway can verify the same capability.

use crate::cache::{EdgeCache, ResourceClass};
use crate::edge::state::EdgeState;
use crate::error::EdgeError;
use crate::metrics;
use axum::{
    extract::{OriginalUri, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

pub async fn proxy_resource(OriginalUri(uri): OriginalUri, State(state): State<EdgeState>) -> Response {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    if let Some(entry) = state.cache.get(&path_and_query) {
        metrics::record_cache_outcome(true);
        if state.config.log_requests {
            info!(resource = %entry.resource, "cache HIT");
        }
        return hit_response(&entry);
    }

    metrics::record_cache_outcome(false);
    if state.config.log_requests {
        info!(resource = %path_and_query, "cache MISS");
    }

    let origin_url = format!(
        "{}{}",
        state.config.origin_base_url.trim_end_matches('/'),
        path_and_query
    );

    let response = match state.http_client.get(&origin_url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            warn!(error = %e, "failed to reach origin");
            metrics::record_origin_error();
            return EdgeError::OriginUnreachable.into_response();
        }
    };

    if response.status() != StatusCode::OK {
        // Passthrough, never cached.
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned();
        let body = response.bytes().await.unwrap_or_default();
        let mut builder = Response::builder().status(status);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        return builder.body(axum::body::Body::from(body)).unwrap();
    }

    // Classification (TTL selection, media-type fallback, and the
    // X-CDN-Resource* headers) must run on the signature-stripped resource,
    // not the raw URL — `path_and_query` still carries `?exp=&sig=`, and a
    // suffix match like `ends_with(".m3u8")` can never match through that.
    let resource = EdgeCache::normalized_resource(&path_and_query);

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| guess_media_type(&resource).to_string());

    let bytes = match response.bytes().await {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "failed to read origin response body");
            return EdgeError::OriginUnreachable.into_response();
        }
    };

    let class = ResourceClass::classify(&resource);
    let ttl = class.ttl(&state.config.ttl_policy());
    state
        .cache
        .set(&path_and_query, bytes.to_vec(), content_type.clone(), ttl);

    miss_response(&resource, &content_type, ttl, bytes.to_vec())
}

fn hit_response(entry: &crate::cache::CacheEntry) -> Response {
    let now = now_secs();
    let ttl_remaining = entry.ttl_remaining(now);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &entry.content_type)
        .header("X-CDN-Cache", "HIT")
        .header("X-CDN-TTL-Remaining", ttl_remaining.to_string())
        .header("X-CDN-Resource", &entry.resource)
        .header("X-CDN-Resource-Type", entry.resource_type().as_str())
        .header("X-CDN-Hit-Count", entry.hit_count.to_string())
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={ttl_remaining}"),
        )
        .body(axum::body::Body::from(entry.content.clone()))
        .unwrap()
}

fn miss_response(resource: &str, content_type: &str, ttl: i64, content: Vec<u8>) -> Response {
    let ttl = ttl.max(0);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header("X-CDN-Cache", "MISS")
        .header("X-CDN-TTL", ttl.to_string())
        .header("X-CDN-Resource", resource)
        .header(
            "X-CDN-Resource-Type",
            ResourceClass::classify(resource).as_str(),
        )
        .header(header::CACHE_CONTROL, format!("public, max-age={ttl}"))
        .body(axum::body::Body::from(content))
        .unwrap()
}

fn guess_media_type(path: &str) -> &'static str {
    if path.ends_with(".m3u8") {
        "application/vnd.apple.mpegurl"
    } else if path.ends_with(".m4s") {
        "video/iso.segment"
    } else if path.ends_with(".mp4") {
        "video/mp4"
    } else if path.ends_with(".json") {
        "application/json"
    } else {
        "application/octet-stream"
    }
}

fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}
