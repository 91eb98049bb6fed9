//! Identifier classification and arXiv reference handling.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Prefixes that wrap a bare arXiv id, stripped in this order.
const ARXIV_PREFIXES: &[&str] = &[
    "https://arxiv.org/abs/",
    "http://arxiv.org/abs/",
    "https://arxiv.org/pdf/",
    "http://arxiv.org/pdf/",
    "https://export.arxiv.org/abs/",
    "arxiv:",
];

/// DOI prefix registered by arXiv
const ARXIV_DOI_PREFIX: &str = "10.48550/arxiv.";

/// Host fragment identifying arXiv URLs
const ARXIV_HOST: &str = "arxiv.org";

/// The kind of paper reference a raw identifier string names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierClass {
    /// URL pointing straight at a PDF file
    DirectUrl,
    /// URL of a landing page or other non-PDF resource
    IndirectUrl,
    /// PubMed identifier (digits only)
    Pmid,
    /// Anything else, assumed to be DOI-shaped
    Doi,
}

impl IdentifierClass {
    pub fn name(&self) -> &'static str {
        match self {
            IdentifierClass::DirectUrl => "direct URL",
            IdentifierClass::IndirectUrl => "indirect URL",
            IdentifierClass::Pmid => "PMID",
            IdentifierClass::Doi => "DOI",
        }
    }
}

impl std::fmt::Display for IdentifierClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Classify a raw identifier.
///
/// Total and permissive: strings that are neither URLs nor digit runs fall
/// through to [`IdentifierClass::Doi`] without any format check. Malformed
/// input is rejected later, when the request URL is built.
pub fn classify(identifier: &str) -> IdentifierClass {
    let lower = identifier.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        if lower.ends_with(".pdf") {
            return IdentifierClass::DirectUrl;
        }
        return IdentifierClass::IndirectUrl;
    }

    if !identifier.is_empty() && identifier.chars().all(|c| c.is_ascii_digit()) {
        return IdentifierClass::Pmid;
    }

    IdentifierClass::Doi
}

/// Whether the identifier refers to an arXiv paper (arXiv host or arXiv DOI).
///
/// The DOI may be embedded, as in `https://doi.org/10.48550/arXiv.1706.03762`.
pub fn is_arxiv(identifier: &str) -> bool {
    let lower = identifier.trim().to_ascii_lowercase();
    lower.contains(ARXIV_HOST) || lower.contains(ARXIV_DOI_PREFIX) || lower.starts_with("arxiv:")
}

/// Strip known arXiv wrappers, returning the bare id.
///
/// Handles formats like:
/// - "10.48550/arXiv.1706.03762"
/// - "https://doi.org/10.48550/arXiv.1706.03762"
/// - "https://arxiv.org/abs/1706.03762"
/// - "https://arxiv.org/pdf/1706.03762.pdf"
/// - "arXiv:1706.03762"
///
/// Identifiers without a known prefix are returned trimmed. Version suffixes
/// are kept, since the PDF endpoint serves them.
pub fn strip_arxiv_prefixes(identifier: &str) -> String {
    let trimmed = identifier.trim();
    let lower = trimmed.to_ascii_lowercase();

    // ASCII lowercasing keeps byte offsets aligned with `trimmed`
    let mut id = trimmed;
    if let Some(at) = lower.find(ARXIV_DOI_PREFIX) {
        id = &trimmed[at + ARXIV_DOI_PREFIX.len()..];
    } else {
        for prefix in ARXIV_PREFIXES {
            if lower.starts_with(prefix) {
                id = &trimmed[prefix.len()..];
                break;
            }
        }
    }

    let id = if id.to_ascii_lowercase().ends_with(".pdf") {
        &id[..id.len() - 4]
    } else {
        id
    };

    id.trim().to_string()
}

/// Loose DOI shape check (`10.<registrant>/<suffix>`).
///
/// Not used by [`classify`]; callers use it to warn about identifiers that
/// will most likely be rejected upstream.
pub fn looks_like_doi(identifier: &str) -> bool {
    static DOI_RE: OnceLock<Option<Regex>> = OnceLock::new();
    DOI_RE
        .get_or_init(|| Regex::new(r"^10\.\d{4,9}/[-._;()/:a-zA-Z0-9]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(identifier.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_urls() {
        assert_eq!(
            classify("https://example.org/papers/x.pdf"),
            IdentifierClass::DirectUrl
        );
        assert_eq!(
            classify("http://example.org/x.PDF"),
            IdentifierClass::DirectUrl
        );
        assert_eq!(
            classify("https://doi.org/10.1038/nature14539"),
            IdentifierClass::IndirectUrl
        );
        assert_eq!(
            classify("http://example.org/pdf/viewer"),
            IdentifierClass::IndirectUrl
        );
    }

    #[test]
    fn test_classify_scheme_is_case_insensitive() {
        assert_eq!(classify("HTTPS://example.org/x.pdf"), IdentifierClass::DirectUrl);
        assert_eq!(classify("Http://example.org/page"), IdentifierClass::IndirectUrl);
    }

    #[test]
    fn test_classify_pmid() {
        assert_eq!(classify("31452104"), IdentifierClass::Pmid);
        assert_eq!(classify("1"), IdentifierClass::Pmid);
    }

    #[test]
    fn test_classify_falls_back_to_doi() {
        assert_eq!(classify("10.1038/nature14539"), IdentifierClass::Doi);
        assert_eq!(classify("123abc"), IdentifierClass::Doi);
        assert_eq!(classify("not a doi at all"), IdentifierClass::Doi);
        assert_eq!(classify(""), IdentifierClass::Doi);
        // Scheme must be a real http(s) prefix
        assert_eq!(classify("httpbin"), IdentifierClass::Doi);
    }

    #[test]
    fn test_is_arxiv() {
        assert!(is_arxiv("10.48550/arXiv.1706.03762"));
        assert!(is_arxiv("https://arxiv.org/abs/1706.03762"));
        assert!(is_arxiv("arXiv:1706.03762"));
        assert!(is_arxiv("https://doi.org/10.48550/arXiv.1706.03762"));
        assert!(is_arxiv("https://dx.doi.org/10.48550/ARXIV.1706.03762"));
        assert!(!is_arxiv("10.1038/nature14539"));
        assert!(!is_arxiv("31452104"));
    }

    #[test]
    fn test_strip_arxiv_prefixes() {
        assert_eq!(strip_arxiv_prefixes("10.48550/arXiv.1706.03762"), "1706.03762");
        assert_eq!(
            strip_arxiv_prefixes("https://arxiv.org/abs/1706.03762v5"),
            "1706.03762v5"
        );
        assert_eq!(
            strip_arxiv_prefixes("https://arxiv.org/pdf/1706.03762.pdf"),
            "1706.03762"
        );
        assert_eq!(strip_arxiv_prefixes("ARXIV:2301.12345"), "2301.12345");
        assert_eq!(
            strip_arxiv_prefixes("https://doi.org/10.48550/arXiv.1706.03762"),
            "1706.03762"
        );
        assert_eq!(
            strip_arxiv_prefixes("https://dx.doi.org/10.48550/arXiv.2301.12345v2"),
            "2301.12345v2"
        );
        assert_eq!(
            strip_arxiv_prefixes("  10.1038/nature14539 \n"),
            "10.1038/nature14539"
        );
    }

    #[test]
    fn test_looks_like_doi() {
        assert!(looks_like_doi("10.1038/nature14539"));
        assert!(looks_like_doi("10.1126/science.1157996"));
        assert!(!looks_like_doi("nature14539"));
        assert!(!looks_like_doi("10.12/x"));
    }
}
