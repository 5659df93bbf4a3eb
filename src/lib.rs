//! Signed HLS streaming gateway and CDN edge cache.
//!
//! Two cooperating services share this library: the streaming gateway
//! ([`gateway`]) mints and verifies capability URLs and rewrites HLS
//! manifests, and the CDN edge ([`edge`]) proxies those URLs while caching
//! popular resources in memory. See `DESIGN.md` for the module-by-module
//! design rationale.

pub mod cache;
pub mod config;
pub mod edge;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod playlist;
pub mod signing;
pub mod storage;
