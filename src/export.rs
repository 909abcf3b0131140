//! Export orchestration: the library's entry point
//!
//! [`Exporter`] drives extraction → resolution → materialization → rewriting
//! for one HTML fragment at a time, accumulating assets under its export
//! root, and finally packages the tree into an archive. Reference failures
//! are isolated: each one becomes a log line plus a broadcast [`Event`], and
//! the element keeps its original markup.

use crate::archive;
use crate::blob::BlobStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{ExtractedElement, Extractor};
use crate::fragment::{Element, Patch, apply_patches};
use crate::materialize::Materializer;
use crate::resolve::Resolver;
use crate::rewrite::rewrite_element;
use crate::types::{AttachmentReference, Event, RecordId, ReferenceKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Static export attachment pipeline for one export job
///
/// One `Exporter` owns one export root. Fragments are processed one at a
/// time with [`process`](Self::process); when every record has been
/// processed, [`finalize`](Self::finalize) packages the accumulated tree
/// into a single archive and removes the tree.
pub struct Exporter {
    extractor: Extractor,
    resolver: Resolver,
    materializer: Materializer,
    export_root: PathBuf,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl Exporter {
    /// Create an exporter rooted at `export_root`
    ///
    /// Validates the configuration, creates the export root directory, and
    /// sets up the event broadcast channel. Network fetches use a plain
    /// [`reqwest::Client`] with no timeout policy; use
    /// [`with_http_client`](Self::with_http_client) to bound requests.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use actiontext_export::{Config, Exporter, MemoryBlobStore, RecordId};
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let exporter = Exporter::new(
    ///     Config::default(),
    ///     Arc::new(MemoryBlobStore::new()),
    ///     "/tmp/my-export",
    /// )
    /// .await?;
    ///
    /// let html = exporter
    ///     .process("<p>no attachments here</p>", "article", RecordId::new(1))
    ///     .await;
    /// assert_eq!(html, "<p>no attachments here</p>");
    ///
    /// let archive = exporter.finalize().await?;
    /// println!("packaged: {}", archive.display());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(
        config: Config,
        blob_store: Arc<dyn BlobStore>,
        export_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::with_http_client(config, blob_store, export_root, reqwest::Client::new()).await
    }

    /// Create an exporter that fetches through a caller-supplied client
    ///
    /// The core enforces no network timeouts of its own; callers wanting
    /// bounds preconfigure them on `client`.
    pub async fn with_http_client(
        config: Config,
        blob_store: Arc<dyn BlobStore>,
        export_root: impl Into<PathBuf>,
        client: reqwest::Client,
    ) -> Result<Self> {
        config.validate()?;
        let export_root = export_root.into();

        tokio::fs::create_dir_all(&export_root)
            .await
            .map_err(|source| Error::Filesystem {
                path: export_root.clone(),
                source,
            })?;

        // Buffered so slow subscribers lag and drop rather than block the pipeline
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Ok(Self {
            extractor: Extractor::new()?,
            resolver: Resolver::new(config, blob_store, client),
            materializer: Materializer::new(&export_root),
            export_root,
            event_tx,
        })
    }

    /// Subscribe to failure events
    ///
    /// Every handled per-reference failure is broadcast to all active
    /// subscribers. A lagging subscriber drops events; the pipeline never
    /// blocks on delivery.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The directory this exporter materializes assets into
    pub fn export_root(&self) -> &Path {
        &self.export_root
    }

    /// Process one record's HTML fragment
    ///
    /// Rewrites every recognized attachment reference to point at a freshly
    /// materialized file under the export root and returns the rewritten
    /// fragment. Never returns an error: a failed reference keeps its
    /// original markup and is reported through [`subscribe`](Self::subscribe)
    /// and the log. Blank input returns an empty string with no side effects.
    pub async fn process(&self, html: &str, record_type: &str, record_id: RecordId) -> String {
        if html.trim().is_empty() {
            return String::new();
        }

        let candidates = self.extractor.scan(html);
        if candidates.is_empty() {
            return html.to_string();
        }

        let total = candidates.len();
        let mut failed = 0usize;
        let mut patches: Vec<Patch> = Vec::new();

        for candidate in candidates {
            let ExtractedElement {
                element,
                kind,
                decoded,
            } = candidate;
            let outcome = match decoded {
                Ok(reference) => {
                    self.process_reference(html, &element, &reference, record_type, record_id)
                        .await
                }
                Err(error) => Err(error),
            };
            match outcome {
                Ok(mut element_patches) => patches.append(&mut element_patches),
                Err(error) => {
                    failed += 1;
                    self.report_failure(kind, &error, record_type, record_id);
                }
            }
        }

        info!(
            record_type = %record_type,
            record_id = %record_id,
            references = total,
            failed = failed,
            "processed fragment"
        );

        apply_patches(html, patches)
    }

    /// Package the accumulated export tree into `<export_root>.zip`
    ///
    /// On success the working tree is deleted and the archive path is
    /// returned. On failure the tree is left intact for retry or inspection
    /// and the error propagates.
    pub async fn finalize(&self) -> Result<PathBuf> {
        archive::pack_tree(&self.export_root).await
    }

    /// Resolve, materialize, and build the rewrite patches for one reference
    async fn process_reference(
        &self,
        html: &str,
        element: &Element,
        reference: &AttachmentReference,
        record_type: &str,
        record_id: RecordId,
    ) -> Result<Vec<Patch>> {
        let asset = self.resolver.resolve(reference).await?;
        let placed = self
            .materializer
            .persist(record_type, record_id, &asset)
            .await?;
        rewrite_element(
            html,
            element,
            reference,
            &placed.relative_path,
            &asset.filename,
        )
    }

    /// Log a handled failure and broadcast its event
    ///
    /// Resolver failures carry their own event names (`blob_not_found`,
    /// `attachment_download_failed`); everything else maps to the event for
    /// the reference's shape.
    fn report_failure(
        &self,
        kind: ReferenceKind,
        error: &Error,
        record_type: &str,
        record_id: RecordId,
    ) {
        warn!(
            record_type = %record_type,
            record_id = %record_id,
            component = error.component(),
            error_code = error.error_code(),
            error = %error,
            "attachment reference failed; original markup kept"
        );

        let record_type = record_type.to_string();
        let component = error.component().to_string();
        let message = error.to_string();
        let event = match error {
            Error::AssetNotFound { signed_id } => Event::BlobNotFound {
                record_type,
                record_id,
                signed_id: signed_id.clone(),
                component,
                error: message,
            },
            Error::FetchFailed { url, .. } => Event::AttachmentDownloadFailed {
                record_type,
                record_id,
                url: url.clone(),
                component,
                error: message,
            },
            _ => match kind {
                ReferenceKind::InlineAttachment => Event::AttachmentElementFailed {
                    record_type,
                    record_id,
                    component,
                    error: message,
                },
                ReferenceKind::FigureAttachment => Event::FigureElementFailed {
                    record_type,
                    record_id,
                    component,
                    error: message,
                },
                ReferenceKind::ImgTag => Event::ImageElementFailed {
                    record_type,
                    record_id,
                    component,
                    error: message,
                },
            },
        };
        self.emit_event(event);
    }

    /// Emit an event to all subscribers
    ///
    /// send() returns Err when no receiver is active; the event is dropped
    /// and processing continues.
    fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
