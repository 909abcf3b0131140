//! Filename and extension inference for resolved attachments
//!
//! References do not always declare a filename, and URLs do not always end
//! in one. This module derives a safe, extension-correct name: use the URL's
//! final path segment when its extension is recognizable, otherwise probe
//! the URL for a content type and map it to a canonical extension, otherwise
//! fall back to `.jpg`. The fallback is deliberately lossy and is never
//! retried; producing a usable name always wins over producing a precise
//! one.

use std::path::Path;

/// Extension used when no content type can be determined
pub(crate) const FALLBACK_EXTENSION: &str = "jpg";

/// Name used when a reference yields no usable base name at all
const FALLBACK_STEM: &str = "image";

/// Canonical extensions for the image content types the platform serves
const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/avif", "avif"),
    ("image/svg+xml", "svg"),
    ("image/bmp", "bmp"),
    ("image/tiff", "tiff"),
];

/// Map a content type to its canonical extension
///
/// Parameters after `;` are ignored. Returns `None` for unknown or
/// non-image types.
pub(crate) fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(ct, _)| *ct == essence)
        .map(|(_, ext)| *ext)
}

/// Whether a filename already ends in a recognizable image extension
pub(crate) fn has_image_extension(name: &str) -> bool {
    let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    CONTENT_TYPE_EXTENSIONS.iter().any(|(_, e)| *e == ext)
        || mime_guess::from_ext(&ext)
            .first()
            .is_some_and(|m| m.type_() == mime_guess::mime::IMAGE)
}

/// Extract the last path segment of a URL, percent-decoded
///
/// Works for absolute and relative URLs; query strings and fragments are
/// ignored. Returns `None` when the path ends in `/` or has no segments.
pub(crate) fn url_filename(url: &str) -> Option<String> {
    let segment = if let Ok(parsed) = url::Url::parse(url) {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
    } else {
        // Relative URL: strip query/fragment by hand, then take the tail
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        path.rsplit('/').next().map(str::to_string)
    };

    let segment = segment.filter(|s| !s.is_empty())?;
    match urlencoding::decode(&segment) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(segment),
    }
}

/// Reduce a name to a single safe path component
///
/// Attachment filenames originate in document attributes and cannot be
/// trusted to stay inside the record subdirectory: path separators are
/// resolved to the final component, control characters dropped, and leading
/// dots stripped. An empty result becomes `image`.
pub(crate) fn sanitize(name: &str) -> String {
    let component = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = component
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Extract a filename from a response's Content-Disposition header
///
/// Handles the quoted, unquoted, and RFC 5987 (`filename*=`) forms. The
/// extension is kept; sanitization and extension checks happen downstream.
pub(crate) fn filename_from_content_disposition(response: &reqwest::Response) -> Option<String> {
    let value = response
        .headers()
        .get("content-disposition")?
        .to_str()
        .ok()?;

    for part in value.split(';') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("filename*=") {
            // RFC 5987: charset'lang'percent-encoded-name
            if let Some(idx) = rest.rfind('\'')
                && let Ok(decoded) = urlencoding::decode(&rest[idx + 1..])
                && !decoded.is_empty()
            {
                return Some(decoded.into_owned());
            }
        } else if let Some(rest) = part.strip_prefix("filename=") {
            let name = rest.trim_matches('"');
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Derive a filename for a URL whose reference declared none
///
/// The URL's final path segment is used directly when its extension is
/// recognizable; a Content-Disposition name fills in only when the path
/// yields nothing. When the extension still needs deciding, a content type
/// the server already reported is mapped first; absent that, a single `HEAD`
/// probe supplies one. Failures of any kind fall through to `.jpg`.
pub(crate) async fn infer_remote_filename(
    client: &reqwest::Client,
    url: &str,
    reported_content_type: Option<&str>,
    disposition_filename: Option<&str>,
) -> String {
    let base = url_filename(url).or_else(|| disposition_filename.map(str::to_string));

    if let Some(name) = &base
        && has_image_extension(name)
    {
        return sanitize(name);
    }

    let stem = base
        .as_deref()
        .map(stem_of)
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_STEM)
        .to_string();

    let extension = match reported_content_type {
        Some(content_type) => extension_for_content_type(content_type),
        None => probe_extension(client, url).await,
    }
    .unwrap_or(FALLBACK_EXTENSION);
    sanitize(&format!("{stem}.{extension}"))
}

/// HEAD the URL and map its content type to a canonical extension
async fn probe_extension(client: &reqwest::Client, url: &str) -> Option<&'static str> {
    let response = client.head(url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let content_type = response.headers().get("content-type")?.to_str().ok()?;
    extension_for_content_type(content_type)
}

/// Base name without its final extension, if any
fn stem_of(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn maps_known_content_types_to_canonical_extensions() {
        assert_eq!(extension_for_content_type("image/webp"), Some("webp"));
        assert_eq!(extension_for_content_type("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for_content_type("IMAGE/PNG"), Some("png"));
        assert_eq!(
            extension_for_content_type("image/svg+xml; charset=utf-8"),
            Some("svg")
        );
        assert_eq!(extension_for_content_type("text/html"), None);
        assert_eq!(extension_for_content_type(""), None);
    }

    #[test]
    fn recognizes_image_extensions() {
        assert!(has_image_extension("photo.png"));
        assert!(has_image_extension("photo.JPG"));
        assert!(has_image_extension("archive.2024.webp"));
        assert!(!has_image_extension("photo"));
        assert!(!has_image_extension("notes.txt"));
        assert!(!has_image_extension("archive.tar.gz"));
    }

    #[test]
    fn url_filename_handles_absolute_and_relative_urls() {
        assert_eq!(
            url_filename("https://cdn.example.com/media/photo.png?v=2").as_deref(),
            Some("photo.png")
        );
        assert_eq!(
            url_filename("/uploads/summer%20trip.jpg").as_deref(),
            Some("summer trip.jpg")
        );
        assert_eq!(url_filename("https://cdn.example.com/"), None);
        assert_eq!(url_filename("/media/"), None);
        assert_eq!(
            url_filename("relative/path/pic.gif#frag").as_deref(),
            Some("pic.gif")
        );
    }

    #[test]
    fn sanitize_reduces_to_a_single_component() {
        assert_eq!(sanitize("photo.png"), "photo.png");
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize(".hidden.png"), "hidden.png");
        assert_eq!(sanitize("name\u{0}with\u{1f}controls.png"), "namewithcontrols.png");
        assert_eq!(sanitize(""), "image");
        assert_eq!(sanitize("..."), "image");
    }

    /// Helper: serve a HEAD response and return a client plus the URL to probe.
    async fn head_server(path_str: &str, template: ResponseTemplate) -> (MockServer, String) {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path(path_str))
            .respond_with(template)
            .mount(&server)
            .await;
        let url = format!("{}{}", server.uri(), path_str);
        (server, url)
    }

    #[tokio::test]
    async fn recognizable_url_extension_wins_without_probing() {
        // No mock server at this address: a probe would fail the test by
        // falling back to .jpg
        let client = reqwest::Client::new();
        let name =
            infer_remote_filename(&client, "http://127.0.0.1:9/p/photo.webp", None, None).await;
        assert_eq!(name, "photo.webp");
    }

    #[tokio::test]
    async fn probe_supplies_extension_for_bare_segment() {
        let (_server, url) = head_server(
            "/media/avatar",
            ResponseTemplate::new(200).insert_header("content-type", "image/webp"),
        )
        .await;
        let client = reqwest::Client::new();
        assert_eq!(
            infer_remote_filename(&client, &url, None, None).await,
            "avatar.webp"
        );
    }

    #[tokio::test]
    async fn unrecognized_extension_is_replaced_via_probe() {
        let (_server, url) = head_server(
            "/media/picture.blob",
            ResponseTemplate::new(200).insert_header("content-type", "image/png"),
        )
        .await;
        let client = reqwest::Client::new();
        assert_eq!(
            infer_remote_filename(&client, &url, None, None).await,
            "picture.png"
        );
    }

    #[tokio::test]
    async fn reported_content_type_short_circuits_the_probe() {
        // No HEAD mock anywhere: probing would fall back to .jpg
        let client = reqwest::Client::new();
        let name = infer_remote_filename(
            &client,
            "http://127.0.0.1:9/media/avatar",
            Some("image/webp"),
            None,
        )
        .await;
        assert_eq!(name, "avatar.webp");
    }

    #[tokio::test]
    async fn unknown_reported_content_type_falls_back_to_jpg() {
        let client = reqwest::Client::new();
        let name = infer_remote_filename(
            &client,
            "http://127.0.0.1:9/media/avatar",
            Some("application/octet-stream"),
            None,
        )
        .await;
        assert_eq!(name, "avatar.jpg");
    }

    #[tokio::test]
    async fn disposition_name_fills_in_when_the_path_yields_nothing() {
        let client = reqwest::Client::new();
        let name = infer_remote_filename(
            &client,
            "http://127.0.0.1:9/",
            Some("image/png"),
            Some("team photo.png"),
        )
        .await;
        assert_eq!(name, "team photo.png");
    }

    #[tokio::test]
    async fn path_segment_outranks_the_disposition_name() {
        let client = reqwest::Client::new();
        let name = infer_remote_filename(
            &client,
            "http://127.0.0.1:9/media/avatar",
            Some("image/gif"),
            Some("other.png"),
        )
        .await;
        assert_eq!(name, "avatar.gif");
    }

    #[tokio::test]
    async fn failed_probe_falls_back_to_jpg() {
        let (_server, url) = head_server("/media/avatar", ResponseTemplate::new(404)).await;
        let client = reqwest::Client::new();
        assert_eq!(
            infer_remote_filename(&client, &url, None, None).await,
            "avatar.jpg"
        );
    }

    #[tokio::test]
    async fn unreachable_host_falls_back_to_jpg() {
        let client = reqwest::Client::new();
        let name =
            infer_remote_filename(&client, "http://127.0.0.1:9/media/avatar", None, None).await;
        assert_eq!(name, "avatar.jpg");
    }

    #[tokio::test]
    async fn non_image_content_type_falls_back_to_jpg() {
        let (_server, url) = head_server(
            "/media/avatar",
            ResponseTemplate::new(200).insert_header("content-type", "text/html"),
        )
        .await;
        let client = reqwest::Client::new();
        assert_eq!(
            infer_remote_filename(&client, &url, None, None).await,
            "avatar.jpg"
        );
    }

    #[tokio::test]
    async fn urls_without_segments_use_the_image_stem() {
        let (_server, url) = head_server(
            "/",
            ResponseTemplate::new(200).insert_header("content-type", "image/gif"),
        )
        .await;
        let client = reqwest::Client::new();
        assert_eq!(
            infer_remote_filename(&client, &url, None, None).await,
            "image.gif"
        );
    }

    /// Helper: make a GET request against a mocked response and return it.
    async fn mock_response(path_str: &str, template: ResponseTemplate) -> reqwest::Response {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(path_str))
            .respond_with(template)
            .mount(&server)
            .await;
        reqwest::get(format!("{}{}", server.uri(), path_str))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn content_disposition_quoted_filename() {
        let response = mock_response(
            "/dl",
            ResponseTemplate::new(200).insert_header(
                "Content-Disposition",
                r#"attachment; filename="team photo.png""#,
            ),
        )
        .await;
        assert_eq!(
            filename_from_content_disposition(&response).as_deref(),
            Some("team photo.png")
        );
    }

    #[tokio::test]
    async fn content_disposition_unquoted_filename() {
        let response = mock_response(
            "/dl",
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "inline; filename=banner.gif"),
        )
        .await;
        assert_eq!(
            filename_from_content_disposition(&response).as_deref(),
            Some("banner.gif")
        );
    }

    #[tokio::test]
    async fn content_disposition_rfc5987_filename() {
        let response = mock_response(
            "/dl",
            ResponseTemplate::new(200).insert_header(
                "Content-Disposition",
                "attachment; filename*=UTF-8''summer%20trip.jpg",
            ),
        )
        .await;
        assert_eq!(
            filename_from_content_disposition(&response).as_deref(),
            Some("summer trip.jpg")
        );
    }

    #[tokio::test]
    async fn missing_content_disposition_yields_none() {
        let response = mock_response("/dl", ResponseTemplate::new(200)).await;
        assert_eq!(filename_from_content_disposition(&response), None);
    }
}
