//! Blob store collaborator for internally stored attachments
//!
//! The pipeline never talks to storage directly; it asks a [`BlobStore`] for
//! the content behind a signed identifier captured from a blob-storage URL.
//! Two implementations ship with the crate:
//!
//! - [`MemoryBlobStore`]: map-backed store for tests and small deployments
//! - [`NullBlobStore`]: always misses, for callers with no internal storage

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Binary content plus naming metadata returned by a blob lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    /// Raw blob bytes
    pub bytes: Vec<u8>,
    /// Filename the platform stored the blob under
    pub filename: String,
    /// Content type recorded for the blob, when known
    pub content_type: Option<String>,
}

/// Trait for blob storage lookups by signed identifier
///
/// `Ok(None)` is the not-found signal; `Err` is reserved for store
/// infrastructure failures. The pipeline treats both as a missing asset for
/// the reference being processed, but logs infrastructure failures.
///
/// # Examples
///
/// ```
/// use actiontext_export::{BlobStore, MemoryBlobStore, StoredBlob};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryBlobStore::new();
/// store
///     .insert(
///         "XYZ",
///         StoredBlob {
///             bytes: vec![0x89, 0x50, 0x4e, 0x47],
///             filename: "photo.png".into(),
///             content_type: Some("image/png".into()),
///         },
///     )
///     .await;
///
/// let blob = store.get("XYZ").await?.ok_or("missing")?;
/// assert_eq!(blob.filename, "photo.png");
/// assert_eq!(store.get("unknown").await?, None);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Look up a blob by its signed identifier
    async fn get(&self, signed_id: &str) -> crate::Result<Option<StoredBlob>>;
}

/// Map-backed blob store
///
/// Holds blobs in memory behind an async lock. Useful for tests and for
/// deployments where the caller preloads every attachment before exporting.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob under a signed identifier
    pub async fn insert(&self, signed_id: impl Into<String>, blob: StoredBlob) {
        self.blobs.write().await.insert(signed_id.into(), blob);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, signed_id: &str) -> crate::Result<Option<StoredBlob>> {
        Ok(self.blobs.read().await.get(signed_id).cloned())
    }
}

/// Blob store that never finds anything
///
/// For callers without internal storage: every blob-backed reference misses,
/// is reported as `blob_not_found`, and keeps its original markup.
pub struct NullBlobStore;

#[async_trait]
impl BlobStore for NullBlobStore {
    async fn get(&self, _signed_id: &str) -> crate::Result<Option<StoredBlob>> {
        Ok(None)
    }
}
