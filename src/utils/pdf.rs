//! PDF response validation.
//!
//! Upstream mirrors regularly answer with HTML error pages, captchas or empty
//! bodies under a 200 status, so a response is only accepted once its
//! leading bytes carry the PDF signature.

use sha2::{Digest, Sha256};

use crate::models::ValidationVerdict;

/// `%PDF`
pub const PDF_MAGIC: [u8; 4] = [0x25, 0x50, 0x44, 0x46];

/// Content types that say nothing about the payload
const AMBIGUOUS_CONTENT_TYPES: &[&str] = &[
    "application/octet-stream",
    "binary/octet-stream",
    "application/binary",
    "application/download",
    "application/force-download",
];

/// Strip parameters and normalise case: `Text/HTML; charset=utf-8` -> `text/html`
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether the body starts with the PDF signature
pub fn has_pdf_magic(body: &[u8]) -> bool {
    body.starts_with(&PDF_MAGIC)
}

/// Whether a declared content type indicates a PDF
pub fn is_pdf_content_type(content_type: &str) -> bool {
    essence(content_type).contains("pdf")
}

/// Whether a declared content type indicates an HTML page
pub fn is_html_content_type(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence == "text/html" || essence == "application/xhtml+xml"
}

/// Whether a content type is absent in all but name
pub fn is_ambiguous_content_type(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence.is_empty() || AMBIGUOUS_CONTENT_TYPES.contains(&essence.as_str())
}

/// Decide whether a response body is a PDF.
///
/// The magic bytes win over the declared type. A specific non-PDF content
/// type yields [`ValidationVerdict::WrongContentType`]; everything else that
/// fails the signature check is [`ValidationVerdict::NotAPdf`].
pub fn validate(content_type: Option<&str>, body: &[u8]) -> ValidationVerdict {
    if has_pdf_magic(body) {
        return ValidationVerdict::Valid;
    }

    match content_type {
        Some(ct) if !is_ambiguous_content_type(ct) && !is_pdf_content_type(ct) => {
            ValidationVerdict::WrongContentType(ct.to_string())
        }
        _ => ValidationVerdict::NotAPdf,
    }
}

/// Content-addressed filename: `{sha256 of body}-{last 20 chars of the URL tail}`.
///
/// Any `#view=...` fragment is dropped from the tail first.
pub fn hashed_filename(url: &str, body: &[u8]) -> String {
    let tail = url.rsplit('/').next().unwrap_or_default();
    let tail = match tail.find("#view=") {
        Some(pos) => &tail[..pos],
        None => tail,
    };

    let chars: Vec<char> = tail.chars().collect();
    let start = chars.len().saturating_sub(20);
    let suffix: String = chars[start..].iter().collect();

    let digest = Sha256::digest(body);
    let hash: String = digest.iter().map(|b| format!("{:02x}", b)).collect();

    format!("{}-{}", hash, suffix)
}
