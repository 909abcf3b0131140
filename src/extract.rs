//! Reference extraction from HTML fragments
//!
//! Recognizes the three attachment encodings in document order:
//! `<action-text-attachment>` elements, `<figure>` elements carrying a
//! serialized `data-trix-attachment` payload, and plain `<img>` elements
//! whose src points into the blob-storage URL namespace. The pass is
//! read-only; rewriting happens later against the recorded byte spans.

use crate::error::{Error, Result};
use crate::filename::url_filename;
use crate::fragment::{Element, find_element};
use crate::types::{AttachmentReference, ReferenceKind};
use regex::Regex;
use serde::Deserialize;

/// Tag name of the inline attachment element
pub(crate) const ATTACHMENT_TAG: &str = "action-text-attachment";
/// Figure attribute holding the serialized attachment payload
pub(crate) const TRIX_ATTACHMENT_ATTR: &str = "data-trix-attachment";
/// Figure attribute holding the serialized presentation payload (caption)
pub(crate) const TRIX_ATTRIBUTES_ATTR: &str = "data-trix-attributes";

/// Serialized `data-trix-attachment` payload
///
/// Optional-schema parse: every field may be absent; unknown fields are
/// ignored here and preserved by the rewriter, which patches the original
/// JSON value rather than this struct.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrixAttachmentPayload {
    content_type: Option<String>,
    url: Option<String>,
    filename: Option<String>,
}

/// Serialized `data-trix-attributes` payload; only the caption matters here
#[derive(Debug, Deserialize)]
struct TrixAttributesPayload {
    caption: Option<String>,
}

/// Recognizes blob-storage URLs and captures their signed identifier
///
/// Two shapes are recognized: direct blob access and derived
/// representations, each with optional `redirect/` or `proxy/` routing
/// segments. Anything else is not an internal URL.
pub(crate) struct BlobUrlMatcher {
    blob: Regex,
    representation: Regex,
}

impl BlobUrlMatcher {
    /// Compile the two URL patterns
    pub fn new() -> Result<Self> {
        let blob = Regex::new(r"/rails/active_storage/blobs/(?:redirect/|proxy/)?([^/?#]+)")
            .map_err(pattern_error)?;
        let representation =
            Regex::new(r"/rails/active_storage/representations/(?:redirect/|proxy/)?([^/?#]+)")
                .map_err(pattern_error)?;
        Ok(Self {
            blob,
            representation,
        })
    }

    /// Capture the signed identifier when the URL points into blob storage
    pub fn signed_id(&self, url: &str) -> Option<String> {
        self.blob
            .captures(url)
            .or_else(|| self.representation.captures(url))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

fn pattern_error(e: regex::Error) -> Error {
    Error::Config {
        message: format!("invalid blob URL pattern: {e}"),
        key: None,
    }
}

/// One recognized element: its location plus the decode outcome
///
/// A decode error (malformed figure payload) still identifies the element
/// and its kind so the orchestrator can emit the right event and leave the
/// markup untouched.
pub(crate) struct ExtractedElement {
    /// The element's spans and attributes
    pub element: Element,
    /// Which encoding matched
    pub kind: ReferenceKind,
    /// The typed reference, or why it could not be built
    pub decoded: Result<AttachmentReference>,
}

/// Scans fragments for the three attachment encodings
pub(crate) struct Extractor {
    matcher: BlobUrlMatcher,
}

impl Extractor {
    /// Build an extractor with compiled URL patterns
    pub fn new() -> Result<Self> {
        Ok(Self {
            matcher: BlobUrlMatcher::new()?,
        })
    }

    /// Access the URL matcher (shared with the resolver)
    pub fn matcher(&self) -> &BlobUrlMatcher {
        &self.matcher
    }

    /// Scan a fragment, yielding recognized elements in document order
    ///
    /// Attachments and payload-carrying figures own their content: an
    /// `<img>` nested inside one is part of that element's rewrite, never a
    /// standalone reference. Ownership is exclusive in both directions — a
    /// figure wrapping an already-recognized attachment element is skipped
    /// too, so no two candidates ever patch the same span.
    pub fn scan(&self, html: &str) -> Vec<ExtractedElement> {
        let mut candidates = Vec::new();
        // Spans owned by recognized elements; anything overlapping one is
        // part of that element's rewrite, not a candidate of its own
        let mut owned: Vec<std::ops::Range<usize>> = Vec::new();

        let mut pos = 0;
        while let Some(element) = find_element(html, ATTACHMENT_TAG, pos) {
            pos = element.span.end;
            owned.push(element.span.clone());
            if let Some(reference) = self.decode_attachment(&element) {
                candidates.push(ExtractedElement {
                    element,
                    kind: ReferenceKind::InlineAttachment,
                    decoded: Ok(reference),
                });
            }
        }

        let mut pos = 0;
        while let Some(element) = find_element(html, "figure", pos) {
            pos = element.span.end;
            if !element.has_attr(TRIX_ATTACHMENT_ATTR) {
                continue;
            }
            if overlaps(&owned, &element.span) {
                continue;
            }
            owned.push(element.span.clone());
            let decoded = self.decode_figure(&element);
            candidates.push(ExtractedElement {
                element,
                kind: ReferenceKind::FigureAttachment,
                decoded,
            });
        }

        let mut pos = 0;
        while let Some(element) = find_element(html, "img", pos) {
            pos = element.span.end;
            if overlaps(&owned, &element.span) {
                continue;
            }
            if let Some(reference) = self.decode_img(&element) {
                candidates.push(ExtractedElement {
                    element,
                    kind: ReferenceKind::ImgTag,
                    decoded: Ok(reference),
                });
            }
        }

        candidates.sort_by_key(|c| c.element.span.start);
        candidates
    }

    /// Decode an inline attachment element
    ///
    /// Only matched when the content type starts with `image/` and both url
    /// and filename are present; anything else is not a reference and the
    /// element passes through silently.
    fn decode_attachment(&self, element: &Element) -> Option<AttachmentReference> {
        let content_type = element.attr("content-type").unwrap_or_default();
        let url = element.attr("url").unwrap_or_default();
        let filename = element.attr("filename").unwrap_or_default();
        if !content_type.starts_with("image/") || url.is_empty() || filename.is_empty() {
            return None;
        }
        Some(AttachmentReference {
            kind: ReferenceKind::InlineAttachment,
            source_url: url.to_string(),
            declared_filename: Some(filename.to_string()),
            declared_content_type: Some(content_type.to_string()),
            caption: element
                .attr("caption")
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            signed_id: self.matcher.signed_id(url),
        })
    }

    /// Decode a figure element's serialized payloads
    fn decode_figure(&self, element: &Element) -> Result<AttachmentReference> {
        let raw = element.attr(TRIX_ATTACHMENT_ATTR).unwrap_or_default();
        let payload: TrixAttachmentPayload =
            serde_json::from_str(raw).map_err(|e| Error::MalformedReference {
                reason: format!("invalid {TRIX_ATTACHMENT_ATTR} JSON: {e}"),
            })?;
        let url = payload
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::MalformedReference {
                reason: format!("{TRIX_ATTACHMENT_ATTR} payload has no url"),
            })?;

        let declared_filename = payload
            .filename
            .filter(|f| !f.is_empty())
            .or_else(|| url_filename(&url));

        // The caption payload is advisory: absent or malformed JSON just
        // means no caption.
        let caption = element
            .attr(TRIX_ATTRIBUTES_ATTR)
            .and_then(|raw| serde_json::from_str::<TrixAttributesPayload>(raw).ok())
            .and_then(|p| p.caption)
            .filter(|c| !c.is_empty());

        Ok(AttachmentReference {
            kind: ReferenceKind::FigureAttachment,
            signed_id: self.matcher.signed_id(&url),
            source_url: url,
            declared_filename,
            declared_content_type: payload.content_type.filter(|c| !c.is_empty()),
            caption,
        })
    }

    /// Decode a plain img element; only blob-storage srcs are references
    fn decode_img(&self, element: &Element) -> Option<AttachmentReference> {
        let src = element.attr("src").filter(|s| !s.is_empty())?;
        let signed_id = self.matcher.signed_id(src)?;
        Some(AttachmentReference {
            kind: ReferenceKind::ImgTag,
            source_url: src.to_string(),
            declared_filename: None,
            declared_content_type: None,
            caption: None,
            signed_id: Some(signed_id),
        })
    }
}

fn overlaps(owned: &[std::ops::Range<usize>], span: &std::ops::Range<usize>) -> bool {
    owned
        .iter()
        .any(|other| other.start < span.end && span.start < other.end)
}
