//! Shared state for the streaming gateway's handlers.
//!
//! One struct, built once at startup and cloned cheaply per request via
//! `Arc`/`Clone` fields.

use crate::config::GatewayConfig;
use crate::signing::Signer;
use crate::storage::{FilesystemObjectStore, ObjectStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub signer: Signer,
    pub storage: Arc<dyn ObjectStore>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl GatewayState {
    /// Default construction for the real binary: a filesystem-backed
    /// object store rooted at `STORAGE_ROOT` (defaulting to `./data`).
    pub fn new(config: GatewayConfig) -> Self {
        let root = std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "./data".to_string());
        let storage = Arc::new(FilesystemObjectStore::new(root));
        Self::with_storage(config, storage)
    }

    /// Override the object store (e.g. with an in-memory fake) while
    /// keeping the rest of the stack real — what test fixtures use.
    pub fn with_storage(config: GatewayConfig, storage: Arc<dyn ObjectStore>) -> Self {
        let signer = Signer::new(config.signing_secret.clone());
        Self {
            config: Arc::new(config),
            signer,
            storage,
            metrics_handle: None,
        }
    }

    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
