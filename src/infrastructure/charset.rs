//! Character-set transcoding
//!
//! The registry serves pages in legacy Thai encodings (TIS-620 /
//! windows-874) as well as UTF-8, so every body is transcoded before
//! parsing. The charset is taken from the `Content-Type` header, then from a
//! `<meta>` declaration near the top of the document, then the fallback.

use encoding_rs::Encoding;

/// How far into the body to look for a `<meta charset>` declaration
const META_SNIFF_BYTES: usize = 2048;

/// Charset named by a `Content-Type` header value, if recognised.
pub fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches(['"', '\'']).as_bytes()))
}

/// Charset declared by `<meta charset=..>` or `<meta http-equiv content="..; charset=..">`.
pub fn charset_from_markup(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let start = head.find("charset=")? + "charset=".len();
    let value = head[start..].trim_start_matches(['"', '\'', ' ']);
    let end = value
        .find(|c: char| matches!(c, '"' | '\'' | ';' | '>' | '/') || c.is_whitespace())
        .unwrap_or(value.len());

    Encoding::for_label(value[..end].as_bytes())
}

/// Pick the encoding for a body.
pub fn detect_encoding(
    body: &[u8],
    content_type: Option<&str>,
    fallback: &'static Encoding,
) -> &'static Encoding {
    content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_markup(body))
        .unwrap_or(fallback)
}

/// Decode a body to UTF-8, returning the text and the encoding actually used.
///
/// A byte-order mark overrides any declaration. Malformed sequences become
/// U+FFFD rather than failing the page.
pub fn decode_body(
    body: &[u8],
    content_type: Option<&str>,
    fallback: &'static Encoding,
) -> (String, &'static Encoding) {
    let declared = detect_encoding(body, content_type, fallback);
    let (text, used, had_errors) = declared.decode(body);
    if had_errors {
        tracing::debug!(encoding = used.name(), "Body contained malformed sequences");
    }
    (text.into_owned(), used)
}

/// Resolve an encoding label from configuration.
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}
