//! `/cache/entries`, `/cache/entries/{id}`, `/cache/summary` — analytics
//! introspection for dashboards.
//!
//! Entry listings never include raw bytes unless `include_content=true` is
//! passed explicitly, in which case a base64-encoded preview of the first
//! 512 bytes is attached.

use crate::cache::CacheEntry;
use crate::edge::handlers::health::round2;
use crate::edge::state::EdgeState;
use crate::error::{EdgeError, EdgeResult};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;

/// Render a Unix-epoch-seconds timestamp as RFC 3339, for dashboards that
/// want a human-readable time rather than raw epoch seconds.
fn iso(epoch_secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

fn entry_metadata(entry: &CacheEntry) -> Value {
    let now = now_secs();
    json!({
        "cache_id": entry.cache_key,
        "resource": entry.resource,
        "resource_type": entry.resource_type().as_str(),
        "origin_host": entry.origin_host,
        "content_type": entry.content_type,
        "size_bytes": entry.size_bytes,
        "size_kb": round2(entry.size_bytes as f64 / 1024.0),
        "stored_at": entry.stored_at,
        "stored_at_iso": iso(entry.stored_at),
        "expires_at": entry.expires_at,
        "expires_at_iso": iso(entry.expires_at),
        "ttl_remaining": entry.ttl_remaining(now),
        "hit_count": entry.hit_count,
        "last_accessed_at": entry.last_accessed_at,
        "last_accessed_at_iso": iso(entry.last_accessed_at),
    })
}

pub async fn list_entries(State(state): State<EdgeState>) -> impl IntoResponse {
    let entries: Vec<Value> = state.cache.list_entries().iter().map(entry_metadata).collect();
    Json(json!({
        "total": entries.len(),
        "entries": entries,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EntryQuery {
    #[serde(default)]
    pub include_content: bool,
}

pub async fn get_entry(
    Path(cache_id): Path<String>,
    Query(query): Query<EntryQuery>,
    State(state): State<EdgeState>,
) -> EdgeResult<Response> {
    let entry = state
        .cache
        .get_entry(&cache_id)
        .ok_or(EdgeError::CacheEntryNotFound)?;

    let mut metadata = entry_metadata(&entry);
    if query.include_content {
        let preview_len = entry.content.len().min(512);
        let preview = base64::engine::general_purpose::STANDARD.encode(&entry.content[..preview_len]);
        let obj = metadata.as_object_mut().expect("entry_metadata returns an object");
        obj.insert("content_preview_base64".into(), json!(preview));
        obj.insert("content_preview_bytes".into(), json!(preview_len));
        obj.insert("content_total_bytes".into(), json!(entry.content.len()));
    }

    Ok(Json(metadata).into_response())
}

pub async fn summary(State(state): State<EdgeState>) -> impl IntoResponse {
    let entries = state.cache.list_entries();
    let now = now_secs();

    let mut by_type: HashMap<&'static str, (u64, u64, f64, usize)> = HashMap::new();
    let mut total_bytes = 0u64;

    for entry in &entries {
        total_bytes += entry.size_bytes as u64;
        let bucket = by_type.entry(entry.resource_type().as_str()).or_insert((0, 0, 0.0, 0));
        bucket.0 += 1;
        bucket.1 += entry.size_bytes as u64;
        bucket.2 += entry.ttl_remaining(now) as f64;
        bucket.3 += 1;
    }

    let by_type_json: HashMap<&'static str, Value> = by_type
        .into_iter()
        .map(|(k, (count, bytes, ttl_sum, n))| {
            let avg_ttl = if n > 0 { round2(ttl_sum / n as f64) } else { 0.0 };
            (
                k,
                json!({
                    "count": count,
                    "bytes": bytes,
                    "mb": round2(bytes as f64 / (1024.0 * 1024.0)),
                    "avg_ttl_remaining": avg_ttl,
                }),
            )
        })
        .collect();

    Json(json!({
        "total_entries": entries.len(),
        "total_bytes": total_bytes,
        "total_mb": round2(total_bytes as f64 / (1024.0 * 1024.0)),
        "by_type": by_type_json,
    }))
}
