//! MIME body tree and its canonical byte form.
//!
//! The canonical form is what gets signed, so writing must be
//! deterministic and `write(parse(write(p))) == write(p)` must hold:
//!
//! ```text
//! Name: value\r\n        one line per header field, in order
//! \r\n                   end of header section
//! <content>
//! ```
//!
//! Multipart content is `--B\r\n<part>\r\n` for each part followed by
//! `--B--\r\n`. Headers are never folded on output; folded input is
//! unfolded on parse.

use std::ops::Range;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mail_parser::{Header, MessageParser, PartType};
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::headers::Headers;
use crate::error::MimeError;
use crate::limits::{BASE64_LINE_LENGTH, MAX_MIME_DEPTH};

const CRLF: &[u8] = b"\r\n";

/// Length of generated multipart boundaries.
const BOUNDARY_LENGTH: usize = 32;

/// Content of a part: a leaf body or a list of sub-parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    /// Leaf body bytes, stored in transfer-encoded form.
    Single(Vec<u8>),
    /// Sub-parts separated by `boundary`.
    Multipart {
        /// Boundary string (without the leading dashes).
        boundary: String,
        /// The sub-parts in order.
        parts: Vec<Part>,
    },
}

/// A MIME entity: header section plus content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    pub(crate) headers: Headers,
    pub(crate) content: Content,
}

impl Part {
    /// Build a part from headers and content.
    pub fn new(headers: Headers, content: Content) -> Self {
        Self { headers, content }
    }

    /// A `text/plain` UTF-8 part.
    pub fn text(text: &str) -> Self {
        Self::text_with_subtype("plain", text)
    }

    /// A `text/html` UTF-8 part.
    pub fn html(html: &str) -> Self {
        Self::text_with_subtype("html", html)
    }

    fn text_with_subtype(subtype: &str, text: &str) -> Self {
        let mut headers = Headers::new();
        headers.set("Content-Type", &format!("text/{}; charset=UTF-8", subtype));
        headers.set("Content-Transfer-Encoding", "8bit");
        Self {
            headers,
            content: Content::Single(text.as_bytes().to_vec()),
        }
    }

    /// A base64-encoded attachment.
    pub fn attachment(filename: &str, mime_type: &str, data: &[u8]) -> Self {
        let filename = filename.replace('"', "");
        let mut headers = Headers::new();
        headers.set(
            "Content-Type",
            &format!("{}; name=\"{}\"", mime_type, filename),
        );
        headers.set(
            "Content-Disposition",
            &format!("attachment; filename=\"{}\"", filename),
        );
        headers.set("Content-Transfer-Encoding", "base64");
        Self {
            headers,
            content: Content::Single(wrap_base64(data)),
        }
    }

    /// A `multipart/{subtype}` container with a fresh random boundary.
    pub fn multipart(subtype: &str, parts: Vec<Part>) -> Self {
        let boundary = generate_boundary();
        let mut headers = Headers::new();
        headers.set(
            "Content-Type",
            &format!("multipart/{}; boundary=\"{}\"", subtype, boundary),
        );
        Self {
            headers,
            content: Content::Multipart { boundary, parts },
        }
    }

    /// The part's headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the part's headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// The part's content.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Lowercase media type without parameters. Defaults to `text/plain`.
    pub fn mime_type(&self) -> String {
        self.headers
            .first("Content-Type")
            .and_then(|v| v.split(';').next())
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text/plain".to_string())
    }

    /// Match the media type against `type/subtype` or `type/*`.
    pub fn is_mime_type(&self, pattern: &str) -> bool {
        let mime_type = self.mime_type();
        match pattern.strip_suffix("/*") {
            Some(major) => mime_type
                .split('/')
                .next()
                .is_some_and(|m| m.eq_ignore_ascii_case(major)),
            None => mime_type.eq_ignore_ascii_case(pattern),
        }
    }

    /// Whether the part is marked as an attachment.
    pub fn is_attachment(&self) -> bool {
        self.headers
            .first("Content-Disposition")
            .map(|v| v.trim_start().to_ascii_lowercase().starts_with("attachment"))
            .unwrap_or(false)
    }

    /// Leaf content with the transfer encoding removed.
    ///
    /// Returns `None` for multipart content or an undecodable base64 body.
    pub fn decoded_content(&self) -> Option<Vec<u8>> {
        let Content::Single(bytes) = &self.content else {
            return None;
        };
        let is_base64 = self
            .headers
            .first("Content-Transfer-Encoding")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("base64"));

        if is_base64 {
            let compact: Vec<u8> = bytes
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            STANDARD.decode(compact).ok()
        } else {
            Some(bytes.clone())
        }
    }

    /// Leaf parts below this one, depth first.
    pub fn leaves(&self) -> Vec<&Part> {
        let mut leaves = Vec::new();
        collect_leaves(self, &mut leaves);
        leaves
    }

    /// Canonical bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_part(self, &mut out);
        out
    }

    /// Canonical bytes with the named top-level headers left out.
    pub(crate) fn to_bytes_excluding(&self, excluded: &[&str]) -> Vec<u8> {
        let mut headers = self.headers.clone();
        headers.retain(|f| !excluded.iter().any(|name| f.name().eq_ignore_ascii_case(name)));

        let mut out = Vec::new();
        write_headers(&headers, &mut out);
        write_content(&self.content, &mut out);
        out
    }

    /// Parse canonical (or folded) bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MimeError> {
        parse_root(bytes)
    }
}

fn collect_leaves<'a>(part: &'a Part, leaves: &mut Vec<&'a Part>) {
    match &part.content {
        Content::Single(_) => leaves.push(part),
        Content::Multipart { parts, .. } => {
            for sub in parts {
                collect_leaves(sub, leaves);
            }
        }
    }
}

fn generate_boundary() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_LENGTH)
        .map(char::from)
        .collect();
    format!("=_{}", random)
}

fn wrap_base64(data: &[u8]) -> Vec<u8> {
    let encoded = STANDARD.encode(data);
    let mut out = Vec::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LENGTH * 2);
    for (i, line) in encoded.as_bytes().chunks(BASE64_LINE_LENGTH).enumerate() {
        if i > 0 {
            out.extend_from_slice(CRLF);
        }
        out.extend_from_slice(line);
    }
    out
}

// === Writing ===

fn write_part(part: &Part, out: &mut Vec<u8>) {
    write_headers(&part.headers, out);
    write_content(&part.content, out);
}

fn write_headers(headers: &Headers, out: &mut Vec<u8>) {
    for field in headers.iter() {
        out.extend_from_slice(field.name().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(field.value().as_bytes());
        out.extend_from_slice(CRLF);
    }
    out.extend_from_slice(CRLF);
}

fn write_content(content: &Content, out: &mut Vec<u8>) {
    match content {
        Content::Single(bytes) => out.extend_from_slice(bytes),
        Content::Multipart { boundary, parts } => {
            for sub in parts {
                out.extend_from_slice(b"--");
                out.extend_from_slice(boundary.as_bytes());
                out.extend_from_slice(CRLF);
                write_part(sub, out);
                out.extend_from_slice(CRLF);
            }
            out.extend_from_slice(b"--");
            out.extend_from_slice(boundary.as_bytes());
            out.extend_from_slice(b"--");
            out.extend_from_slice(CRLF);
        }
    }
}

// === Parsing ===
//
// mail-parser tokenizes header fields and finds sub-parts. The tree is
// rebuilt from the raw byte offsets it reports, so leaf bytes and header
// values are kept exactly as they appear on the wire.

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn parse_root(bytes: &[u8]) -> Result<Part, MimeError> {
    if let Some(body) = bytes.strip_prefix(CRLF) {
        return Ok(Part {
            headers: Headers::new(),
            content: Content::Single(body.to_vec()),
        });
    }
    let terminator = find(bytes, b"\r\n\r\n", 0).ok_or(MimeError::MissingHeaderTerminator)?;
    std::str::from_utf8(&bytes[..terminator]).map_err(|_| MimeError::InvalidEncoding)?;

    let message = MessageParser::default()
        .parse(bytes)
        .ok_or(MimeError::Unparseable)?;
    build_part(&message, 0, bytes, 0..bytes.len(), 0)
}

fn build_part(
    message: &mail_parser::Message<'_>,
    id: usize,
    bytes: &[u8],
    span: Range<usize>,
    depth: usize,
) -> Result<Part, MimeError> {
    if depth > MAX_MIME_DEPTH {
        return Err(MimeError::NestingTooDeep {
            max: MAX_MIME_DEPTH,
        });
    }
    let parsed = message.parts.get(id).ok_or(MimeError::Unparseable)?;

    let (headers, body_start) = if bytes[span.clone()].starts_with(CRLF) {
        (Headers::new(), span.start + CRLF.len())
    } else {
        let terminator = find(&bytes[..span.end], b"\r\n\r\n", span.start)
            .ok_or(MimeError::MissingHeaderTerminator)?;
        let section = span.start..terminator + CRLF.len();
        (collect_headers(bytes, &parsed.headers, section)?, terminator + 4)
    };

    let body = body_start..span.end;
    let content = match multipart_boundary(&headers)? {
        Some(boundary) => build_multipart(message, &parsed.body, bytes, body, boundary, depth)?,
        None => Content::Single(bytes[body].to_vec()),
    };
    Ok(Part { headers, content })
}

/// Rebuild header fields from the raw spans mail-parser reports.
///
/// Anything in the section outside a field span must be whitespace.
fn collect_headers(
    bytes: &[u8],
    fields: &[Header<'_>],
    section: Range<usize>,
) -> Result<Headers, MimeError> {
    let text = std::str::from_utf8(&bytes[section.clone()]).map_err(|_| MimeError::InvalidEncoding)?;
    let base = section.start;

    let mut headers = Headers::new();
    let mut cursor = 0;
    for field in fields {
        let start = (field.offset_field as usize).saturating_sub(base);
        let end = ((field.offset_end as usize).saturating_sub(base)).min(text.len());
        if start < cursor || start >= end {
            continue;
        }
        check_gap(&text[cursor..start])?;
        let (name, value) = split_field(&text[start..end])?;
        headers.push_raw(name, value);
        cursor = end;
    }
    check_gap(&text[cursor..])?;
    Ok(headers)
}

fn check_gap(gap: &str) -> Result<(), MimeError> {
    if gap.trim().is_empty() {
        Ok(())
    } else {
        Err(MimeError::InvalidHeaderLine(gap.trim().to_string()))
    }
}

fn split_field(raw: &str) -> Result<(String, String), MimeError> {
    let raw = raw.strip_suffix("\r\n").unwrap_or(raw);
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| MimeError::InvalidHeaderLine(raw.to_string()))?;
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c.is_control()) {
        return Err(MimeError::InvalidHeaderLine(raw.to_string()));
    }
    let value = value.strip_prefix(' ').unwrap_or(value);
    let value = value.replace("\r\n", "").replace(['\r', '\n'], " ");
    Ok((name.to_string(), value))
}

fn multipart_boundary(headers: &Headers) -> Result<Option<String>, MimeError> {
    let Some(content_type) = headers.first("Content-Type") else {
        return Ok(None);
    };
    let mut params = content_type.split(';');
    let is_multipart = params
        .next()
        .map(|t| t.trim().to_ascii_lowercase().starts_with("multipart/"))
        .unwrap_or(false);
    if !is_multipart {
        return Ok(None);
    }

    for param in params {
        if let Some((key, value)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("boundary") {
                let boundary = value.trim().trim_matches('"');
                if boundary.is_empty() {
                    return Err(MimeError::MissingBoundary);
                }
                return Ok(Some(boundary.to_string()));
            }
        }
    }
    Err(MimeError::MissingBoundary)
}

/// Rebuild multipart content from the sub-parts mail-parser found.
///
/// Each sub-part must start right after a `--B` delimiter line and end at
/// the next `\r\n--B` followed by CRLF or `--`. The body must close with
/// `--B--`.
fn build_multipart(
    message: &mail_parser::Message<'_>,
    parsed: &PartType<'_>,
    bytes: &[u8],
    body: Range<usize>,
    boundary: String,
    depth: usize,
) -> Result<Content, MimeError> {
    let unterminated = || MimeError::UnterminatedMultipart(boundary.clone());
    let delimiter = format!("--{}", boundary).into_bytes();
    let inner_delimiter = format!("\r\n--{}", boundary).into_bytes();

    if !bytes[body.clone()].starts_with(&delimiter) {
        return Err(unterminated());
    }
    let mut cursor = body.start + delimiter.len();
    let mut parts = Vec::new();

    if !bytes[cursor..body.end].starts_with(b"--") {
        let PartType::Multipart(children) = parsed else {
            return Err(unterminated());
        };
        for &child in children {
            let child = child as usize;
            let start = message
                .parts
                .get(child)
                .map(|p| p.offset_header as usize)
                .ok_or(MimeError::Unparseable)?;
            if start != cursor + CRLF.len() || !bytes[cursor..body.end].starts_with(CRLF) {
                return Err(unterminated());
            }
            let end = find_delimiter(&bytes[..body.end], &inner_delimiter, start)
                .ok_or_else(unterminated)?;
            parts.push(build_part(message, child, bytes, start..end, depth + 1)?);
            cursor = end + inner_delimiter.len();
        }
        if !bytes[cursor..body.end].starts_with(b"--") {
            return Err(unterminated());
        }
    }

    Ok(Content::Multipart { boundary, parts })
}

/// A delimiter only counts when followed by CRLF or the closing `--`.
fn find_delimiter(bytes: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut search = from;
    loop {
        let candidate = find(bytes, delimiter, search)?;
        let after = &bytes[candidate + delimiter.len()..];
        if after.starts_with(CRLF) || after.starts_with(b"--") {
            return Some(candidate);
        }
        search = candidate + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_part_roundtrip() {
        let part = Part::text("Hello\r\nworld");
        let bytes = part.to_bytes();
        let parsed = Part::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, part);
        assert_eq!(parsed.to_bytes(), bytes);
    }

    #[test]
    fn test_canonical_layout() {
        let mut headers = Headers::new();
        headers.add("Subject", "hi");
        let part = Part::new(headers, Content::Single(b"body".to_vec()));
        assert_eq!(part.to_bytes(), b"Subject: hi\r\n\r\nbody".to_vec());
    }

    #[test]
    fn test_no_headers() {
        let part = Part::from_bytes(b"\r\njust a body").unwrap();
        assert!(part.headers().is_empty());
        assert_eq!(part.content(), &Content::Single(b"just a body".to_vec()));
    }

    #[test]
    fn test_nested_multipart_roundtrip() {
        let inner = Part::multipart(
            "alternative",
            vec![Part::text("plain"), Part::html("<b>html</b>")],
        );
        let outer = Part::multipart(
            "mixed",
            vec![
                inner,
                Part::attachment("a.bin", "application/octet-stream", &[0u8, 1, 2, 255]),
            ],
        );

        let bytes = outer.to_bytes();
        let parsed = Part::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, outer);
        assert_eq!(parsed.to_bytes(), bytes);
        assert_eq!(parsed.leaves().len(), 3);
    }

    #[test]
    fn test_empty_multipart() {
        let part = Part::multipart("mixed", vec![]);
        let parsed = Part::from_bytes(&part.to_bytes()).unwrap();
        assert_eq!(parsed, part);
        assert!(parsed.leaves().is_empty());
    }

    #[test]
    fn test_attachment_decoding() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let part = Part::attachment("data.bin", "application/octet-stream", &data);
        assert!(part.is_attachment());
        assert_eq!(part.mime_type(), "application/octet-stream");
        assert_eq!(part.decoded_content(), Some(data));

        let Content::Single(encoded) = part.content() else {
            panic!("attachment should be a leaf");
        };
        for line in encoded.split(|&b| b == b'\n') {
            assert!(line.len() <= BASE64_LINE_LENGTH + 1);
        }
    }

    #[test]
    fn test_folded_headers_are_unfolded() {
        let parsed = Part::from_bytes(b"Subject: a\r\n  long subject\r\n\r\nbody").unwrap();
        assert_eq!(parsed.headers().first("Subject"), Some("a  long subject"));
    }

    #[test]
    fn test_duplicate_and_unknown_headers_kept_in_order() {
        let bytes = b"X-One: 1\r\nReceived: a\r\nX-Custom-Thing: spaced\r\nReceived: b\r\n\r\nbody";
        let parsed = Part::from_bytes(bytes).unwrap();
        let fields: Vec<(&str, &str)> = parsed
            .headers()
            .iter()
            .map(|f| (f.name(), f.value()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("X-One", "1"),
                ("Received", "a"),
                ("X-Custom-Thing", "spaced"),
                ("Received", "b"),
            ]
        );
        assert_eq!(parsed.content(), &Content::Single(b"body".to_vec()));
    }

    #[test]
    fn test_mime_type_matching() {
        let part = Part::html("x");
        assert_eq!(part.mime_type(), "text/html");
        assert!(part.is_mime_type("text/*"));
        assert!(part.is_mime_type("TEXT/HTML"));
        assert!(!part.is_mime_type("text/plain"));
        assert!(!part.is_attachment());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Part::from_bytes(b"Subject: x\r\nbody"),
            Err(MimeError::MissingHeaderTerminator)
        );
        assert!(Part::from_bytes(b"no colon here\r\n\r\n").is_err());
        assert_eq!(
            Part::from_bytes(b"Content-Type: multipart/mixed\r\n\r\n"),
            Err(MimeError::MissingBoundary)
        );
        assert!(matches!(
            Part::from_bytes(b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\nx"),
            Err(MimeError::UnterminatedMultipart(_))
        ));
        assert_eq!(
            Part::from_bytes(b"Subject: \xff\r\n\r\n"),
            Err(MimeError::InvalidEncoding)
        );
    }

    #[test]
    fn test_nesting_limit() {
        let mut part = Part::text("leaf");
        for _ in 0..=MAX_MIME_DEPTH {
            part = Part::multipart("mixed", vec![part]);
        }
        assert_eq!(
            Part::from_bytes(&part.to_bytes()),
            Err(MimeError::NestingTooDeep {
                max: MAX_MIME_DEPTH
            })
        );
    }
}
