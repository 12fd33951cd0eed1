//! # Object storage
//!
//! `MemoryObjectStore` keeps blobs in a map. `LocalObjectStore` writes to a
//! directory and normalises every upload to WebP so the `.webp` key always
//! matches the stored bytes.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use domains::{DomainError, ObjectStore, Result};
use mime::Mime;
use tokio::fs;

/// Prefix used by the objects collection in `NotFound` errors.
const OBJECTS: &str = "objects";

#[derive(Debug)]
pub struct MemoryObjectStore {
    base_url: String,
    objects: DashMap<String, (Bytes, Mime)>,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: DashMap::new(),
        }
    }

    /// Stored bytes and content type, for assertions.
    pub fn object(&self, key: &str) -> Option<(Bytes, Mime)> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &Mime) -> Result<()> {
        validate_key(key)?;
        self.objects
            .insert(key.to_string(), (data, content_type.clone()));
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String> {
        if !self.objects.contains_key(key) {
            return Err(DomainError::not_found(OBJECTS, key));
        }
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }
}

/// Filesystem store: `{root}/{key}` on disk, `{public_url}/{key}` for
/// download.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    public_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root_path: root.into(),
            public_url: public_url.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root_path.join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    /// Decodes the upload (any format `image` understands), re-encodes it as
    /// WebP and writes it under the key.
    async fn put(&self, key: &str, data: Bytes, content_type: &Mime) -> Result<()> {
        validate_key(key)?;
        tracing::debug!(key, %content_type, size = data.len(), "local: storing image");

        // Decoding and encoding are CPU-bound; keep them off the async workers.
        let webp = tokio::task::spawn_blocking(move || to_webp(&data))
            .await
            .map_err(|e| DomainError::NetworkFailure(format!("image task failed: {e}")))??;

        let target = self.path_for(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        fs::write(&target, webp).await.map_err(io_error)?;
        tracing::info!(key, path = %target.display(), "local: image stored");
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        let exists = fs::try_exists(self.path_for(key)).await.map_err(io_error)?;
        if !exists {
            return Err(DomainError::not_found(OBJECTS, key));
        }
        Ok(format!("{}/{}", self.public_url.trim_end_matches('/'), key))
    }
}

/// Re-encodes any supported image as WebP.
fn to_webp(data: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(data)
        .map_err(|e| DomainError::Validation(format!("Unsupported image: {e}")))?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::WebP)
        .map_err(|e| DomainError::Validation(format!("Could not encode image: {e}")))?;
    Ok(out.into_inner())
}

/// Keys are relative paths without `..`, so they cannot escape the root.
fn validate_key(key: &str) -> Result<()> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(())
    } else {
        Err(DomainError::PermissionDenied(format!("invalid object key {key:?}")))
    }
}

fn io_error(err: std::io::Error) -> DomainError {
    DomainError::NetworkFailure(format!("object storage I/O error: {err}"))
}
