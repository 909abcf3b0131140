//! Common test utilities for actiontext-export E2E tests

#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use actiontext_export::{BlobStore, Config, Event, Exporter, MemoryBlobStore, StoredBlob};
use std::sync::Arc;
use tempfile::TempDir;

/// Create an exporter rooted inside a fresh temp directory
///
/// The `TempDir` must be kept alive for the duration of the test.
pub async fn test_exporter(config: Config, blob_store: Arc<dyn BlobStore>) -> (Exporter, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let exporter = Exporter::new(config, blob_store, dir.path().join("export"))
        .await
        .expect("create exporter");
    (exporter, dir)
}

/// Memory blob store preloaded with a single blob
pub async fn seeded_store(
    signed_id: &str,
    filename: &str,
    bytes: &[u8],
    content_type: &str,
) -> MemoryBlobStore {
    let store = MemoryBlobStore::new();
    store
        .insert(
            signed_id,
            StoredBlob {
                bytes: bytes.to_vec(),
                filename: filename.to_string(),
                content_type: Some(content_type.to_string()),
            },
        )
        .await;
    store
}

/// Collect every event already buffered on the receiver
///
/// `process` is awaited before this runs, so all events for the fragment are
/// sitting in the channel.
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Pull every `src` attribute value out of a fragment, in document order
pub fn extract_srcs(html: &str) -> Vec<String> {
    html.split("src=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next().map(str::to_string))
        .collect()
}

/// The single `src` in a fragment
pub fn extract_src(html: &str) -> String {
    let srcs = extract_srcs(html);
    assert_eq!(srcs.len(), 1, "expected exactly one src in {html}");
    srcs.into_iter().next().expect("one src")
}

/// Assert a rewritten path has the expected record directory and a 16-hex
/// discriminator prefix on the filename
pub fn assert_materialized_path(path: &str, record_dir: &str, filename: &str) {
    let prefix = format!("attachments/{record_dir}/");
    assert!(path.starts_with(&prefix), "{path} should start with {prefix}");
    let file_name = &path[prefix.len()..];
    let (discriminator, rest) = file_name
        .split_once('_')
        .unwrap_or_else(|| panic!("{file_name} should carry a discriminator prefix"));
    assert_eq!(discriminator.len(), 16, "{discriminator}");
    assert!(
        discriminator.chars().all(|c| c.is_ascii_hexdigit()),
        "{discriminator}"
    );
    assert_eq!(rest, filename);
}
