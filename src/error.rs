//! Error types for actiontext-export
//!
//! This module provides error handling for the library, including:
//! - Per-reference error kinds (malformed payloads, missing blobs, failed fetches)
//! - Fatal packaging errors that propagate to the caller
//! - Machine-readable error codes for observability output

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for actiontext-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for actiontext-export
///
/// Per-reference variants (`MalformedReference`, `AssetNotFound`, `FetchFailed`,
/// `Filesystem`) are recovered inside [`Exporter::process`](crate::Exporter::process)
/// and surfaced as events; they never reach the caller. `ArchiveWrite` and `Config`
/// propagate.
#[derive(Debug, Error)]
pub enum Error {
    /// Attachment attribute payload could not be parsed into a usable reference
    #[error("malformed reference: {reason}")]
    MalformedReference {
        /// Why the payload was rejected (parse error, missing url field, etc.)
        reason: String,
    },

    /// Blob store lookup returned no content for a signed identifier
    #[error("asset not found for signed id {signed_id}")]
    AssetNotFound {
        /// The signed identifier extracted from the blob-storage URL
        signed_id: String,
    },

    /// Network fetch failed (connection error, non-2xx status, timeout)
    #[error("fetch failed for {url}: {reason}")]
    FetchFailed {
        /// The absolute URL that was fetched
        url: String,
        /// Transport or status failure description
        reason: String,
    },

    /// Filesystem write failure while materializing an asset
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// The path being created or written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Archive creation failed; the working tree is left intact
    #[error("archive write failed at {path}: {reason}")]
    ArchiveWrite {
        /// The archive path that could not be produced
        path: PathBuf,
        /// What went wrong during packaging
        reason: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "site_url")
        key: Option<String>,
    },
}

impl Error {
    /// Get the machine-readable error code for this error
    ///
    /// Codes are stable strings suitable for structured logs and event payloads.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::MalformedReference { .. } => "malformed_reference",
            Error::AssetNotFound { .. } => "asset_not_found",
            Error::FetchFailed { .. } => "fetch_failed",
            Error::Filesystem { .. } => "filesystem_error",
            Error::ArchiveWrite { .. } => "archive_write_error",
            Error::Config { .. } => "config_error",
        }
    }

    /// Get the pipeline component this error originated from
    ///
    /// Used as the `component` field on emitted failure events.
    pub fn component(&self) -> &'static str {
        match self {
            Error::MalformedReference { .. } => "extractor",
            Error::AssetNotFound { .. } | Error::FetchFailed { .. } => "resolver",
            Error::Filesystem { .. } => "materializer",
            Error::ArchiveWrite { .. } => "packager",
            Error::Config { .. } => "config",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    /// Returns one instance of every Error variant with its expected
    /// error_code and component.
    fn all_error_variants() -> Vec<(Error, &'static str, &'static str)> {
        vec![
            (
                Error::MalformedReference {
                    reason: "invalid JSON".into(),
                },
                "malformed_reference",
                "extractor",
            ),
            (
                Error::AssetNotFound {
                    signed_id: "abc123".into(),
                },
                "asset_not_found",
                "resolver",
            ),
            (
                Error::FetchFailed {
                    url: "https://cdn.example.com/a.png".into(),
                    reason: "connection refused".into(),
                },
                "fetch_failed",
                "resolver",
            ),
            (
                Error::Filesystem {
                    path: PathBuf::from("/tmp/export/attachments"),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                },
                "filesystem_error",
                "materializer",
            ),
            (
                Error::ArchiveWrite {
                    path: PathBuf::from("/tmp/export.zip"),
                    reason: "disk full".into(),
                },
                "archive_write_error",
                "packager",
            ),
            (
                Error::Config {
                    message: "not a valid origin".into(),
                    key: Some("site_url".into()),
                },
                "config_error",
                "config",
            ),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, expected_code, _) in all_error_variants() {
            assert_eq!(
                error.error_code(),
                expected_code,
                "variant {error:?} returned unexpected error_code"
            );
        }
    }

    #[test]
    fn every_variant_maps_to_expected_component() {
        for (error, _, expected_component) in all_error_variants() {
            assert_eq!(
                error.component(),
                expected_component,
                "variant {error:?} returned unexpected component"
            );
        }
    }

    #[test]
    fn display_messages_include_context() {
        let err = Error::FetchFailed {
            url: "https://cdn.example.com/a.png".into(),
            reason: "status 503".into(),
        };
        assert_eq!(
            err.to_string(),
            "fetch failed for https://cdn.example.com/a.png: status 503"
        );

        let err = Error::AssetNotFound {
            signed_id: "XYZ".into(),
        };
        assert_eq!(err.to_string(), "asset not found for signed id XYZ");

        let err = Error::Config {
            message: "not a valid origin".into(),
            key: None,
        };
        assert_eq!(err.to_string(), "configuration error: not a valid origin");
    }

    #[test]
    fn filesystem_error_preserves_io_source() {
        let err = Error::Filesystem {
            path: PathBuf::from("/unwritable/dir"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let source = std::error::Error::source(&err).expect("should have a source");
        assert!(source.to_string().contains("denied"));
    }
}
