//! Byte-span primitives for scanning and patching HTML fragments
//!
//! The pipeline must leave every byte it does not rewrite untouched, so the
//! fragment is never round-tripped through a DOM. Elements are located by
//! scanning the original text, attribute values keep the byte range of their
//! raw form, and rewrites are applied as span patches spliced back into the
//! source string.

use std::ops::Range;

/// One attribute parsed from an element's open tag
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Attribute {
    /// Attribute name, lowercased
    pub name: String,
    /// Entity-decoded value (empty for valueless attributes)
    pub value: String,
    /// Byte range of the raw value text inside the document, excluding quotes;
    /// `None` for valueless attributes
    pub value_span: Option<Range<usize>>,
}

/// One element located inside the fragment
///
/// Spans are absolute byte offsets into the scanned document. For void or
/// self-closed elements `span == open_span` and `content_span` is `None`.
#[derive(Clone, Debug)]
pub(crate) struct Element {
    /// Tag name, lowercased
    pub name: String,
    /// Full element range, from `<` through the close tag's `>`
    pub span: Range<usize>,
    /// Open tag range, from `<` through its `>`
    pub open_span: Range<usize>,
    /// Range between the open and close tags, when the element has both
    pub content_span: Option<Range<usize>>,
    /// Attributes in document order
    pub attributes: Vec<Attribute>,
}

impl Element {
    /// Get an attribute's decoded value by (case-insensitive) name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Get the byte range of an attribute's raw value
    pub fn attr_value_span(&self, name: &str) -> Option<Range<usize>> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value_span.clone())
    }

    /// Whether the open tag carries the attribute at all
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }
}

/// A single span replacement to splice into the document
#[derive(Clone, Debug)]
pub(crate) struct Patch {
    /// Byte range of the original text being replaced
    pub span: Range<usize>,
    /// Replacement text
    pub replacement: String,
}

/// Tags that never have a close tag
const VOID_TAGS: &[&str] = &["img", "br", "hr", "input", "meta", "link", "source"];

/// Find the next element with the given tag name starting at or after `from`
///
/// Container elements without a matching close tag are not returned; the
/// scan should continue past their open tag (`find_element` with `from` set
/// past the open tag does that). Offsets are byte positions produced by
/// ASCII delimiter scanning, so they always fall on UTF-8 boundaries.
pub(crate) fn find_element(html: &str, tag: &str, from: usize) -> Option<Element> {
    let needle = format!("<{tag}");
    let mut search_from = from;

    while let Some(start) = find_ci(html, &needle, search_from) {
        let after_name = start + needle.len();
        // The tag name must end here, otherwise `<figure` would match `<figurex`
        match html.as_bytes().get(after_name) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => {}
            _ => {
                search_from = after_name;
                continue;
            }
        }

        let Some((attributes, open_end, self_closed)) = parse_open_tag(html, after_name) else {
            // Unterminated open tag; nothing sensible can follow it
            return None;
        };
        let open_span = start..open_end;

        if self_closed || VOID_TAGS.contains(&tag) {
            return Some(Element {
                name: tag.to_string(),
                span: open_span.clone(),
                open_span,
                content_span: None,
                attributes,
            });
        }

        let close_needle = format!("</{tag}");
        let Some(close_start) = find_ci(html, &close_needle, open_end) else {
            search_from = open_end;
            continue;
        };
        let Some(close_end) = html[close_start..].find('>').map(|i| close_start + i + 1) else {
            search_from = open_end;
            continue;
        };

        return Some(Element {
            name: tag.to_string(),
            span: start..close_end,
            open_span: open_span.clone(),
            content_span: Some(open_span.end..close_start),
            attributes,
        });
    }

    None
}

/// Parse attributes from `pos` (just past the tag name) to the open tag's `>`
///
/// Returns the attributes, the offset one past `>`, and whether the tag was
/// self-closed with `/>`. Returns `None` when the tag never terminates.
fn parse_open_tag(html: &str, pos: usize) -> Option<(Vec<Attribute>, usize, bool)> {
    let bytes = html.as_bytes();
    let mut i = pos;
    let mut attributes = Vec::new();

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => return Some((attributes, i + 1, false)),
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    return Some((attributes, i + 2, true));
                }
                i += 1;
            }
            _ => {
                let name_start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && bytes[i] != b'='
                    && bytes[i] != b'>'
                    && bytes[i] != b'/'
                {
                    i += 1;
                }
                let name = html[name_start..i].to_ascii_lowercase();
                if name.is_empty() {
                    // Stray byte; step over it rather than looping forever
                    i += 1;
                    continue;
                }

                let mut j = i;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if bytes.get(j) != Some(&b'=') {
                    attributes.push(Attribute {
                        name,
                        value: String::new(),
                        value_span: None,
                    });
                    continue;
                }
                i = j + 1;
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }

                match bytes.get(i)? {
                    quote @ (b'"' | b'\'') => {
                        let value_start = i + 1;
                        let value_end = value_start
                            + html[value_start..].find(*quote as char).unwrap_or(
                                // Unterminated quote swallows the rest of the tag
                                html.len() - value_start,
                            );
                        attributes.push(Attribute {
                            name,
                            value: unescape_entities(&html[value_start..value_end]),
                            value_span: Some(value_start..value_end),
                        });
                        i = (value_end + 1).min(html.len());
                    }
                    _ => {
                        let value_start = i;
                        while i < bytes.len()
                            && !bytes[i].is_ascii_whitespace()
                            && bytes[i] != b'>'
                        {
                            i += 1;
                        }
                        attributes.push(Attribute {
                            name,
                            value: unescape_entities(&html[value_start..i]),
                            value_span: Some(value_start..i),
                        });
                    }
                }
            }
        }
    }
}

/// Case-insensitive substring search over ASCII needles
fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|i| from + i)
}

/// Decode the HTML entities that appear in attribute values
///
/// Handles the named entities attribute encoding produces plus decimal and
/// hex numeric references. Unrecognized sequences pass through unchanged.
pub(crate) fn unescape_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail[..tail.len().min(12)].find(';') else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        num.parse::<u32>().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Encode a string for safe placement inside a double-quoted attribute value
pub(crate) fn escape_attribute(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Splice a set of non-overlapping patches into the document
///
/// Patches may arrive in any order; everything outside the patched spans is
/// copied through byte-for-byte.
pub(crate) fn apply_patches(html: &str, mut patches: Vec<Patch>) -> String {
    patches.sort_by_key(|p| p.span.start);
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for patch in patches {
        debug_assert!(patch.span.start >= cursor, "patch spans must not overlap");
        out.push_str(&html[cursor..patch.span.start]);
        out.push_str(&patch.replacement);
        cursor = patch.span.end;
    }
    out.push_str(&html[cursor..]);
    out
}
