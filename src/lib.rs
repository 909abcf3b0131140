//! # actiontext-export
//!
//! Static export pipeline for rich-text attachments: turns HTML fragments
//! referencing internally or remotely stored media into self-contained
//! bundles, rewriting each fragment to point at the exported files and
//! packaging the result as one deterministic archive.
//!
//! ## Design Philosophy
//!
//! actiontext-export is designed to be:
//! - **Byte-preserving** - Document content outside rewritten references
//!   survives byte-for-byte
//! - **Failure-isolated** - One broken attachment never aborts an export;
//!   failed references keep their original markup
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to failure events, no polling
//!   required
//!
//! ## Quick Start
//!
//! ```no_run
//! use actiontext_export::{Config, Exporter, MemoryBlobStore, RecordId};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = Exporter::new(
//!         Config::default(),
//!         Arc::new(MemoryBlobStore::new()),
//!         "/tmp/blog-export",
//!     )
//!     .await?;
//!
//!     // Subscribe to failure events
//!     let mut events = exporter.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("event: {:?}", event);
//!         }
//!     });
//!
//!     let html = r#"<img src="/rails/active_storage/blobs/XYZ/photo.png">"#;
//!     let rewritten = exporter.process(html, "article", RecordId::new(42)).await;
//!     println!("{rewritten}");
//!
//!     let archive = exporter.finalize().await?;
//!     println!("archive at {}", archive.display());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Deterministic packaging of export trees
pub mod archive;
/// Blob store trait and bundled implementations
pub mod blob;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export orchestration (the library's entry point)
pub mod export;
/// Core types and events
pub mod types;

mod extract;
mod filename;
mod fragment;
mod materialize;
mod resolve;
mod rewrite;

// Re-export commonly used types
pub use blob::{BlobStore, MemoryBlobStore, NullBlobStore, StoredBlob};
pub use config::{BaseUrlConfig, Config, DEFAULT_LOCAL_ORIGIN};
pub use error::{Error, Result};
pub use export::Exporter;
pub use types::{Event, RecordId};
