//! Stream-metadata passthrough: `GET /api/stream/{id}` and
//! `POST /api/stream/refresh` forward verbatim to the origin and are never
//! cached (they carry fresh signatures that would poison the cache).

use crate::edge::state::EdgeState;
use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

async fn forward(state: &EdgeState, method: reqwest::Method, url: String, body: Option<Bytes>) -> Response {
    let mut request = state.http_client.request(method, &url);
    if let Some(body) = body {
        request = request
            .header(header::CONTENT_TYPE.as_str(), "application/json")
            .body(body.to_vec());
    }

    match request.send().await {
        Ok(resp) => {
            let status = resp.status();
            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .cloned()
                .unwrap_or_else(|| header::HeaderValue::from_static("application/json"));
            let body = resp.bytes().await.unwrap_or_default();
            Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, content_type)
                .body(axum::body::Body::from(body))
                .unwrap()
        }
        Err(e) => {
            error!(error = %e, "failed to reach streaming API");
            (
                StatusCode::BAD_GATEWAY,
                [(header::CONTENT_TYPE, "application/json")],
                json!({ "detail": "CDN Error: failed to reach streaming API" }).to_string(),
            )
                .into_response()
        }
    }
}

pub async fn stream_metadata(
    Path(track_id): Path<String>,
    OriginalUri(uri): OriginalUri,
    State(state): State<EdgeState>,
) -> Response {
    let query = uri.query().map(|q| format!("?{q}")).unwrap_or_default();
    let url = format!(
        "{}/api/stream/{track_id}{query}",
        state.config.origin_api_base_url.trim_end_matches('/')
    );
    forward(&state, reqwest::Method::GET, url, None).await
}

pub async fn stream_refresh(State(state): State<EdgeState>, body: Bytes) -> Response {
    let url = format!(
        "{}/api/stream/refresh",
        state.config.origin_api_base_url.trim_end_matches('/')
    );
    forward(&state, reqwest::Method::POST, url, Some(body)).await
}
