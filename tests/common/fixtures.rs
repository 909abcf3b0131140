//! HTML fragment fixtures and content generators

/// Figure element whose serialized payload is not JSON
pub const MALFORMED_FIGURE: &str = concat!(
    r#"<p>kept</p>"#,
    r#"<figure data-trix-attachment="definitely not json">"#,
    r#"<img src="/unrelated.png"></figure>"#,
    r#"<p>also kept</p>"#
);

/// Image pointing somewhere outside the blob-storage namespace
pub const EXTERNAL_IMG: &str =
    r#"<p>intro</p><img src="https://elsewhere.example.com/pic.jpg" alt="external">"#;

/// Plain image addressing a blob through the redirect route
pub fn blob_img(signed_id: &str, filename: &str) -> String {
    format!(r#"<img src="/rails/active_storage/blobs/redirect/{signed_id}/{filename}">"#)
}

/// Inline attachment element with no inner image
pub fn inline_attachment(url: &str, filename: &str) -> String {
    format!(
        concat!(
            r#"<action-text-attachment content-type="image/png" "#,
            r#"url="{url}" filename="{filename}"></action-text-attachment>"#
        ),
        url = url,
        filename = filename,
    )
}

/// Figure attachment with a JSON payload and an inner image
pub fn figure_attachment(url: &str, filename: &str) -> String {
    format!(
        concat!(
            r#"<figure data-trix-attachment='{{"contentType":"image/png","#,
            r#""url":"{url}","filename":"{filename}"}}'>"#,
            r#"<img src="{url}"></figure>"#
        ),
        url = url,
        filename = filename,
    )
}

/// Small stand-in for image bytes; the pipeline treats content as opaque
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
    bytes.extend_from_slice(b"fixture image data");
    bytes
}
