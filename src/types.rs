//! Core types for actiontext-export

use serde::{Deserialize, Serialize};

/// Unique identifier for the record that owns an HTML fragment
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Create a new RecordId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RecordId> for i64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for RecordId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl PartialEq<RecordId> for i64 {
    fn eq(&self, other: &RecordId) -> bool {
        *self == other.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// The three attachment encodings recognized inside an HTML fragment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// An `<action-text-attachment>` element with content-type/url/filename attributes
    InlineAttachment,
    /// A `<figure>` element carrying a serialized `data-trix-attachment` payload
    FigureAttachment,
    /// A plain `<img>` whose src points into the blob-storage URL namespace
    ImgTag,
}

/// One attachment reference found during an extraction pass
///
/// Ephemeral: created per pass, identified by its position in the document,
/// discarded once resolved. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentReference {
    /// Which of the three encodings matched
    pub kind: ReferenceKind,
    /// The URL the document currently points at (possibly relative)
    pub source_url: String,
    /// Filename declared by the reference, when the encoding carries one
    pub declared_filename: Option<String>,
    /// Content type declared by the reference, when the encoding carries one
    pub declared_content_type: Option<String>,
    /// Caption text attached to the reference, when present
    pub caption: Option<String>,
    /// Signed blob identifier captured from the URL, when it matches the
    /// internal blob-storage namespace
    pub signed_id: Option<String>,
}

/// Binary content plus naming metadata produced by the resolver
///
/// Immediately consumed by the materializer; never persisted independently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// Raw asset bytes
    pub bytes: Vec<u8>,
    /// Best-effort filename, always non-empty with a usable extension
    pub filename: String,
    /// Content type, when the source declared one
    pub content_type: Option<String>,
}

/// Location of a materialized asset inside the export directory tree
///
/// Written once, read by the rewriter, never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedPath {
    /// Record type label the asset belongs to
    pub record_type: String,
    /// Record identifier the asset belongs to
    pub record_id: RecordId,
    /// Path relative to the export root, using forward slashes
    pub relative_path: String,
}

/// Event emitted for every per-reference failure handled by the pipeline
///
/// The serialized `type` tag is the stable event name; payloads carry the
/// originating component and the error message, never a raw error object.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An inline attachment element could not be processed
    AttachmentElementFailed {
        /// Record type label of the fragment being processed
        record_type: String,
        /// Record identifier of the fragment being processed
        record_id: RecordId,
        /// Pipeline component the failure originated from
        component: String,
        /// Error message
        error: String,
    },

    /// A figure element's serialized payload could not be processed
    FigureElementFailed {
        /// Record type label of the fragment being processed
        record_type: String,
        /// Record identifier of the fragment being processed
        record_id: RecordId,
        /// Pipeline component the failure originated from
        component: String,
        /// Error message
        error: String,
    },

    /// A blob-backed image element could not be processed
    ImageElementFailed {
        /// Record type label of the fragment being processed
        record_type: String,
        /// Record identifier of the fragment being processed
        record_id: RecordId,
        /// Pipeline component the failure originated from
        component: String,
        /// Error message
        error: String,
    },

    /// A network fetch for an attachment failed; the reference keeps its
    /// original markup
    AttachmentDownloadFailed {
        /// Record type label of the fragment being processed
        record_type: String,
        /// Record identifier of the fragment being processed
        record_id: RecordId,
        /// The URL that could not be fetched
        url: String,
        /// Pipeline component the failure originated from
        component: String,
        /// Error message
        error: String,
    },

    /// A signed identifier had no blob behind it; the reference keeps its
    /// original markup
    BlobNotFound {
        /// Record type label of the fragment being processed
        record_type: String,
        /// Record identifier of the fragment being processed
        record_id: RecordId,
        /// The signed identifier that missed
        signed_id: String,
        /// Pipeline component the failure originated from
        component: String,
        /// Error message
        error: String,
    },
}

impl Event {
    /// Get the stable event name (the serialized `type` tag)
    pub fn name(&self) -> &'static str {
        match self {
            Event::AttachmentElementFailed { .. } => "attachment_element_failed",
            Event::FigureElementFailed { .. } => "figure_element_failed",
            Event::ImageElementFailed { .. } => "image_element_failed",
            Event::AttachmentDownloadFailed { .. } => "attachment_download_failed",
            Event::BlobNotFound { .. } => "blob_not_found",
        }
    }
}
