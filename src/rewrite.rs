//! Replacement markup for resolved references
//!
//! Produces span patches against the original fragment; nothing outside the
//! patched spans is touched. Patches for all references in a pass are built
//! against the same scan and spliced in one [`apply_patches`] call by the
//! orchestrator.

use crate::error::{Error, Result};
use crate::extract::TRIX_ATTACHMENT_ATTR;
use crate::fragment::{Element, Patch, escape_attribute, find_element};
use crate::types::{AttachmentReference, ReferenceKind};

/// Build the patches that point one reference at its materialized path
///
/// `element` must have been located in this same `html`. `filename` is the
/// resolved asset's name, used as alt text when no caption is available.
pub(crate) fn rewrite_element(
    html: &str,
    element: &Element,
    reference: &AttachmentReference,
    new_path: &str,
    filename: &str,
) -> Result<Vec<Patch>> {
    match reference.kind {
        ReferenceKind::ImgTag => Ok(vec![attr_patch(element, "src", new_path)?]),
        ReferenceKind::InlineAttachment => {
            rewrite_attachment(html, element, reference, new_path, filename)
        }
        ReferenceKind::FigureAttachment => {
            rewrite_figure(html, element, reference, new_path, filename)
        }
    }
}

/// Inline attachment: patch the element's own `url`, then the inner image
///
/// Without an inner image the whole element collapses into a plain `<img>`
/// pointing at the materialized path.
fn rewrite_attachment(
    html: &str,
    element: &Element,
    reference: &AttachmentReference,
    new_path: &str,
    filename: &str,
) -> Result<Vec<Patch>> {
    let alt = reference.caption.as_deref().unwrap_or(filename);
    match inner_img(html, element) {
        Some(img) => {
            let mut patches = vec![
                attr_patch(element, "url", new_path)?,
                attr_patch(&img, "src", new_path)?,
            ];
            patches.extend(alt_insertion(html, &img, alt));
            Ok(patches)
        }
        None => Ok(vec![Patch {
            span: element.span.clone(),
            replacement: synthesized_img(new_path, alt),
        }]),
    }
}

/// Figure: re-point the serialized payload, then update or add the inner image
fn rewrite_figure(
    html: &str,
    element: &Element,
    reference: &AttachmentReference,
    new_path: &str,
    filename: &str,
) -> Result<Vec<Patch>> {
    let alt = reference.caption.as_deref().unwrap_or(filename);
    let mut patches = vec![payload_patch(element, new_path)?];

    match inner_img(html, element) {
        Some(img) => {
            patches.push(attr_patch(&img, "src", new_path)?);
            patches.extend(alt_insertion(html, &img, alt));
        }
        None => {
            // A self-closed figure has no content to hold an image; the
            // payload rewrite alone carries the new path.
            if let Some(content) = element.content_span.clone() {
                patches.push(Patch {
                    span: content.start..content.start,
                    replacement: synthesized_img(new_path, alt),
                });
            }
        }
    }
    Ok(patches)
}

/// Patch an attribute's value span with the escaped replacement
fn attr_patch(element: &Element, name: &str, replacement: &str) -> Result<Patch> {
    let span = element
        .attr_value_span(name)
        .ok_or_else(|| Error::MalformedReference {
            reason: format!("<{}> has no patchable {name} value", element.name),
        })?;
    Ok(Patch {
        span,
        replacement: escape_attribute(replacement),
    })
}

/// Re-serialize the figure payload with its `url` pointing at `new_path`
///
/// The payload is patched as a JSON value, so fields this pipeline does not
/// model survive the rewrite.
fn payload_patch(element: &Element, new_path: &str) -> Result<Patch> {
    let raw = element
        .attr(TRIX_ATTACHMENT_ATTR)
        .ok_or_else(|| Error::MalformedReference {
            reason: format!("<{}> has no {TRIX_ATTACHMENT_ATTR} payload", element.name),
        })?;
    let mut payload: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| Error::MalformedReference {
            reason: format!("invalid {TRIX_ATTACHMENT_ATTR} JSON: {e}"),
        })?;
    let object = payload
        .as_object_mut()
        .ok_or_else(|| Error::MalformedReference {
            reason: format!("{TRIX_ATTACHMENT_ATTR} payload is not an object"),
        })?;
    object.insert(
        "url".to_string(),
        serde_json::Value::String(new_path.to_string()),
    );

    let span = element
        .attr_value_span(TRIX_ATTACHMENT_ATTR)
        .ok_or_else(|| Error::MalformedReference {
            reason: format!("<{}> has no patchable {TRIX_ATTACHMENT_ATTR} value", element.name),
        })?;
    Ok(Patch {
        span,
        replacement: escape_attribute(&payload.to_string()),
    })
}

/// Find the first `<img>` inside the element's content, if any
fn inner_img(html: &str, element: &Element) -> Option<Element> {
    let content = element.content_span.clone()?;
    find_element(html, "img", content.start).filter(|img| img.span.end <= content.end)
}

/// Insert an `alt` when the image has none; an existing `alt` is kept
fn alt_insertion(html: &str, img: &Element, alt: &str) -> Option<Patch> {
    if img.has_attr("alt") {
        return None;
    }
    let insert_at = if html[..img.open_span.end].ends_with("/>") {
        img.open_span.end - 2
    } else {
        img.open_span.end - 1
    };
    Some(Patch {
        span: insert_at..insert_at,
        replacement: format!(r#" alt="{}""#, escape_attribute(alt)),
    })
}

fn synthesized_img(new_path: &str, alt: &str) -> String {
    format!(
        r#"<img src="{}" alt="{}">"#,
        escape_attribute(new_path),
        escape_attribute(alt)
    )
}
