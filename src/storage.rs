//! Object store abstraction backing the streaming gateway.
//!
//! The real deployment talks to MinIO/S3; this crate models the store as an
//! opaque blob reader keyed by string paths and ships two backends: an
//! in-memory map (used by test fixtures) and a filesystem-rooted backend for
//! local/dev use. Both backends expose the identical `ObjectStore` trait, so
//! callers never know which one is active.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures_util::stream::{self, Stream};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;

#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("no such key: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type ObjectChunk = Result<Bytes, StorageError>;
pub type ObjectStream = Pin<Box<dyn Stream<Item = ObjectChunk> + Send>>;

/// Async blob lookup by object key, relative to a configured bucket/root.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fully materialize the object as UTF-8 text. Used for `.m3u8` manifests only.
    async fn read_text(&self, key: &str) -> Result<String, StorageError>;

    /// Stream the object in chunks of at most `chunk_size` bytes.
    async fn stream(&self, key: &str, chunk_size: usize) -> Result<ObjectStream, StorageError>;
}

/// In-memory object store, keyed by the same flat `object_key` namespace
/// the gateway uses. Used by test fixtures in place of a real MinIO client.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<DashMap<String, Bytes>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object before exercising routes against this store.
    pub fn put(&self, key: impl Into<String>, content: impl Into<Bytes>) {
        self.objects.insert(key.into(), content.into());
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn read_text(&self, key: &str) -> Result<String, StorageError> {
        let bytes = self
            .objects
            .get(key)
            .map(|entry| entry.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| StorageError::Backend(format!("object is not valid UTF-8: {e}")))
    }

    async fn stream(&self, key: &str, chunk_size: usize) -> Result<ObjectStream, StorageError> {
        let bytes = self
            .objects
            .get(key)
            .map(|entry| entry.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        let chunk_size = chunk_size.max(1);
        let chunks: Vec<ObjectChunk> = bytes
            .chunks(chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// Filesystem-rooted object store for local development, so the gateway can
/// be exercised against a real transcoder output tree without MinIO running.
#[derive(Clone)]
pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(Path::new(key))
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn read_text(&self, key: &str) -> Result<String, StorageError> {
        tokio::fs::read_to_string(self.resolve(key))
            .await
            .map_err(|e| io_error(key, e))
    }

    async fn stream(&self, key: &str, chunk_size: usize) -> Result<ObjectStream, StorageError> {
        let mut file = tokio::fs::File::open(self.resolve(key))
            .await
            .map_err(|e| io_error(key, e))?;
        let chunk_size = chunk_size.max(1);

        let s = stream::unfold(Vec::with_capacity(chunk_size), move |mut buf| {
            // Reuse the same owned file handle across polls by moving it
            // into the generator state alongside the scratch buffer.
            let file = &mut file;
            async move {
                buf.resize(chunk_size, 0);
                match file.read(&mut buf).await {
                    Ok(0) => None,
                    Ok(n) => {
                        let chunk = Bytes::copy_from_slice(&buf[..n]);
                        Some((Ok(chunk), buf))
                    }
                    Err(e) => Some((
                        Err(StorageError::Backend(format!("read failed: {e}"))),
                        buf,
                    )),
                }
            }
        });

        Ok(Box::pin(s))
    }
}

fn io_error(key: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Backend(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn in_memory_read_text_roundtrips() {
        let store = InMemoryObjectStore::new();
        store.put("tracks/a/b/master.m3u8", "#EXTM3U\n");
        let text = store.read_text("tracks/a/b/master.m3u8").await.unwrap();
        assert_eq!(text, "#EXTM3U\n");
    }

    #[tokio::test]
    async fn in_memory_read_text_missing_key_errors() {
        let store = InMemoryObjectStore::new();
        let err = store.read_text("missing").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn in_memory_stream_chunks_content() {
        let store = InMemoryObjectStore::new();
        store.put("seg.m4s", Bytes::from_static(b"0123456789"));
        let mut stream = store.stream("seg.m4s", 4).await.unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk.unwrap());
        }
        let total: Vec<u8> = chunks.into_iter().flat_map(|b| b.to_vec()).collect();
        assert_eq!(total, b"0123456789");
    }

    #[tokio::test]
    async fn filesystem_store_reads_existing_file() {
        let dir = tempdir();
        std::fs::write(dir.join("index.m3u8"), "#EXTM3U\n").unwrap();
        let store = FilesystemObjectStore::new(&dir);
        let content = store.read_text("index.m3u8").await.unwrap();
        assert_eq!(content, "#EXTM3U\n");
    }

    #[tokio::test]
    async fn filesystem_store_missing_file_is_not_found() {
        let dir = tempdir();
        let store = FilesystemObjectStore::new(&dir);
        let err = store.read_text("nope.m3u8").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "streamgate-test-{}",
            std::process::id().wrapping_add(line!())
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
