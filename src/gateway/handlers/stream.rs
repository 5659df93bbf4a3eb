//! `GET /api/stream/{track_id}` and `POST /api/stream/refresh` — mint
//! signed master/variant URLs for a (artist, track, bitrates) tuple.
//!
//! Both routes produce the same shape; `refresh` exists only so a client
//! can ask for fresh signatures before the previous ones expire.

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::state::GatewayState;
use crate::metrics;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct VariantStream {
    pub bitrate: i64,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct StreamResponse {
    pub master_url: String,
    pub variants: Vec<VariantStream>,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub artist_id: String,
    pub available_bitrates: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub track_id: String,
    pub artist_id: String,
    pub available_bitrates: Option<Vec<i64>>,
}

/// Build the master + variant signed URLs for a track. The emitted URLs
/// point at the `/origin/...` endpoint prefix, while signatures are
/// computed over the true `/tracks/...` resource path.
fn generate_urls(state: &GatewayState, artist_id: &str, track_id: &str, bitrates: &[i64]) -> StreamResponse {
    let base_path = format!("/tracks/{artist_id}/{track_id}/transcoded");
    let service_base_url = state.config.public_base_url();
    let ttl = state.config.playlist_ttl_seconds;

    let master_path = format!("{base_path}/master.m3u8");
    let (signed, sig) = state.signer.sign(&master_path, ttl);
    let master_url = state.signer.build_url(service_base_url, &signed, &sig);
    let master_url = master_url.replacen(&master_path, &format!("/origin{master_path}"), 1);

    let variants = bitrates
        .iter()
        .map(|bitrate| {
            let variant_path = format!("{base_path}/aac_{}/index.m3u8", bitrate / 1000);
            let (signed, sig) = state.signer.sign(&variant_path, ttl);
            let url = state.signer.build_url(service_base_url, &signed, &sig);
            let url = url.replacen(&variant_path, &format!("/origin{variant_path}"), 1);
            VariantStream { bitrate: *bitrate, url }
        })
        .collect();

    StreamResponse {
        master_url,
        variants,
        expires_in: ttl,
    }
}

fn parse_bitrates_csv(raw: &str) -> Option<Vec<i64>> {
    let parsed: Result<Vec<i64>, _> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>())
        .collect();
    match parsed {
        Ok(bitrates) if !bitrates.is_empty() => Some(bitrates),
        _ => None,
    }
}

pub async fn get_stream(
    Path(track_id): Path<String>,
    Query(query): Query<StreamQuery>,
    State(state): State<GatewayState>,
) -> Response {
    let start = Instant::now();
    let bitrates = query
        .available_bitrates
        .as_deref()
        .and_then(parse_bitrates_csv)
        .unwrap_or_else(|| state.config.available_bitrates.clone());

    let response = generate_urls(&state, &query.artist_id, &track_id, &bitrates);
    metrics::record_request("stream_metadata", 200);
    metrics::record_duration("stream_metadata", start);
    Json(response).into_response()
}

pub async fn refresh_stream(
    State(state): State<GatewayState>,
    Json(payload): Json<RefreshRequest>,
) -> GatewayResult<Response> {
    let start = Instant::now();
    let bitrates = payload
        .available_bitrates
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| state.config.available_bitrates.clone());

    if payload.track_id.is_empty() || payload.artist_id.is_empty() {
        return Err(GatewayError::BadRequest(
            "track_id and artist_id are required".into(),
        ));
    }

    let response = generate_urls(&state, &payload.artist_id, &payload.track_id, &bitrates);
    metrics::record_request("stream_refresh", 200);
    metrics::record_duration("stream_refresh", start);
    Ok(Json(response).into_response())
}
