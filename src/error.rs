//! Shared error taxonomy for the gateway and edge services.
//!
//! Each HTTP surface gets one flat enum covering every failure it can
//! actually return, implementing `IntoResponse` directly so handlers can
//! propagate with `?` and still produce the right status code and JSON body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the streaming gateway's origin and stream-metadata
/// endpoints.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, malformed, expired, or mismatched signature.
    #[error("capability invalid: {0}")]
    CapabilityInvalid(String),

    /// The object store reported "no such key".
    #[error("resource not found: {0}")]
    ResourceAbsent(String),

    /// Any other object-store failure.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Malformed request that isn't specifically a signature problem.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            GatewayError::CapabilityInvalid(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            GatewayError::ResourceAbsent(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            GatewayError::StorageFailure(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            GatewayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the CDN edge's proxy and cache-admin endpoints.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// Could not complete an HTTP call to the origin at all.
    #[error("CDN Error: failed to reach streaming API")]
    OriginUnreachable,

    /// Cache entry requested by id does not exist.
    #[error("cache entry not found")]
    CacheEntryNotFound,
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let status = match self {
            EdgeError::OriginUnreachable => StatusCode::BAD_GATEWAY,
            EdgeError::CacheEntryNotFound => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub type EdgeResult<T> = Result<T, EdgeError>;
