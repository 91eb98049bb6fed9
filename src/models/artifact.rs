//! Resolution results and PDF validation verdicts.

use serde::{Deserialize, Serialize};

/// Outcome of checking a response body against the PDF signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum ValidationVerdict {
    /// Body is a PDF
    Valid,
    /// Declared content type is something other than a PDF
    WrongContentType(String),
    /// Magic-bytes check failed
    NotAPdf,
}

/// A resolved paper.
///
/// Content is non-empty exactly when `soft_error` is absent; the
/// constructors are the only way to build one, so the two can't disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedArtifact {
    content: Vec<u8>,
    source_url: String,
    filename: String,
    soft_error: Option<String>,
}

impl RetrievedArtifact {
    /// A successful retrieval. Empty content is reported as a failure instead.
    pub fn success(
        content: Vec<u8>,
        source_url: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        let source_url = source_url.into();
        if content.is_empty() {
            return Self::failed(source_url, "No PDF data received");
        }
        Self {
            content,
            source_url,
            filename: filename.into(),
            soft_error: None,
        }
    }

    /// A failed retrieval carrying a human-readable cause
    pub fn failed(source_url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            content: Vec::new(),
            source_url: source_url.into(),
            filename: String::new(),
            soft_error: Some(error.into()),
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn soft_error(&self) -> Option<&str> {
        self.soft_error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.soft_error.is_none()
    }
}

/// Suggested filename for a mirror-resolved identifier.
///
/// Scheme separators are dropped and `/` and `:` become `-`:
/// `https://doi.org/10.1/x` becomes `doi.org-10.1-x.pdf`.
pub fn filename_for_identifier(identifier: &str) -> String {
    let stem = identifier
        .trim()
        .replace("https://", "")
        .replace("http://", "")
        .replace(['/', ':'], "-");
    format!("{}.pdf", stem)
}

/// Suggested filename for a paper fetched straight from arXiv
pub fn filename_for_arxiv(arxiv_id: &str) -> String {
    format!("arxiv-{}.pdf", arxiv_id.trim().replace(['/', ':'], "-"))
}
