//! Content resolution for attachment references
//!
//! One reference becomes one [`ResolvedAsset`] or one error. References
//! carrying a signed identifier are looked up in the [`BlobStore`]; anything
//! else is fetched over the network, absolutizing relative URLs against the
//! configured base origin first. Fetch failures are never retried — the
//! pipeline favors forward progress over completeness.

use crate::blob::{BlobStore, StoredBlob};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filename::{filename_from_content_disposition, infer_remote_filename, sanitize};
use crate::types::{AttachmentReference, ResolvedAsset};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves references to raw bytes plus naming metadata
pub(crate) struct Resolver {
    config: Config,
    blob_store: Arc<dyn BlobStore>,
    client: reqwest::Client,
}

impl Resolver {
    /// Build a resolver around its collaborators
    pub fn new(config: Config, blob_store: Arc<dyn BlobStore>, client: reqwest::Client) -> Self {
        Self {
            config,
            blob_store,
            client,
        }
    }

    /// Resolve one reference to bytes plus a usable filename
    pub async fn resolve(&self, reference: &AttachmentReference) -> Result<ResolvedAsset> {
        match &reference.signed_id {
            Some(signed_id) => self.resolve_blob(signed_id, reference).await,
            None => self.resolve_remote(reference).await,
        }
    }

    /// Look the blob up by its signed identifier
    ///
    /// A lookup miss and a store infrastructure failure both read as a
    /// missing asset for this reference; infrastructure failures are logged
    /// at their own severity.
    async fn resolve_blob(
        &self,
        signed_id: &str,
        reference: &AttachmentReference,
    ) -> Result<ResolvedAsset> {
        let blob = match self.blob_store.get(signed_id).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                return Err(Error::AssetNotFound {
                    signed_id: signed_id.to_string(),
                });
            }
            Err(error) => {
                warn!(signed_id = %signed_id, error = %error, "blob store lookup failed");
                return Err(Error::AssetNotFound {
                    signed_id: signed_id.to_string(),
                });
            }
        };

        let StoredBlob {
            bytes,
            filename,
            content_type,
        } = blob;

        let filename = match &reference.declared_filename {
            Some(declared) => sanitize(declared),
            None => sanitize(&filename),
        };
        let content_type = content_type.or_else(|| reference.declared_content_type.clone());

        debug!(
            signed_id = %signed_id,
            bytes = bytes.len(),
            filename = %filename,
            "resolved blob attachment"
        );

        Ok(ResolvedAsset {
            bytes,
            filename,
            content_type,
        })
    }

    /// Fetch the reference over the network
    async fn resolve_remote(&self, reference: &AttachmentReference) -> Result<ResolvedAsset> {
        let url = self.absolute_url(&reference.source_url)?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::FetchFailed {
                url: url.clone(),
                reason: describe_request_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchFailed {
                url,
                reason: format!("status {status}"),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let disposition_filename = filename_from_content_disposition(&response);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::FetchFailed {
                url: url.clone(),
                reason: format!("failed to read body: {e}"),
            })?
            .to_vec();

        let filename = match &reference.declared_filename {
            Some(declared) => sanitize(declared),
            None => {
                infer_remote_filename(
                    &self.client,
                    &url,
                    content_type.as_deref(),
                    disposition_filename.as_deref(),
                )
                .await
            }
        };

        debug!(
            url = %url,
            bytes = bytes.len(),
            filename = %filename,
            "fetched remote attachment"
        );

        Ok(ResolvedAsset {
            bytes,
            filename,
            content_type,
        })
    }

    /// Resolve a possibly-relative URL to absolute form
    ///
    /// Relative URLs are joined against the configured base origin (site URL,
    /// then environment default, then the localhost fallback).
    fn absolute_url(&self, source_url: &str) -> Result<String> {
        match url::Url::parse(source_url) {
            Ok(url) => Ok(url.into()),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let origin = self.config.base_url.origin();
                let base = url::Url::parse(origin).map_err(|e| Error::FetchFailed {
                    url: source_url.to_string(),
                    reason: format!("invalid base origin '{origin}': {e}"),
                })?;
                base.join(source_url)
                    .map(String::from)
                    .map_err(|e| Error::FetchFailed {
                        url: source_url.to_string(),
                        reason: format!("cannot resolve against '{origin}': {e}"),
                    })
            }
            Err(e) => Err(Error::FetchFailed {
                url: source_url.to_string(),
                reason: format!("invalid url: {e}"),
            }),
        }
    }
}

/// Summarize a transport failure for the error payload
fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}
