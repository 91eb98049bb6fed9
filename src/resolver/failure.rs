//! Failure types of the resolution engine.

use crate::extract::ExtractError;
use crate::fetch::FetchError;
use crate::utils::Retryable;

/// Why an attempt produced no PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftFailureKind {
    /// Non-2xx status
    Status,
    /// Declared content type is not a PDF
    WrongContentType(String),
    /// Body failed the magic-bytes check
    NotAPdf,
    /// 2xx with nothing in it
    EmptyBody,
    /// Landing page without an embedded document
    NoEmbeddedDocument,
    /// Mirror answered with a captcha challenge
    Captcha,
}

/// A failure specific to one attempt; another attempt may succeed.
///
/// `rate_limited` is decided where the status or page is first looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftFailure {
    pub kind: SoftFailureKind,
    pub status: Option<u16>,
    pub rate_limited: bool,
}

impl SoftFailure {
    pub fn new(kind: SoftFailureKind) -> Self {
        Self {
            kind,
            status: None,
            rate_limited: false,
        }
    }

    /// A non-2xx response; 429 is flagged as rate limiting
    pub fn from_status(status: u16) -> Self {
        Self {
            kind: SoftFailureKind::Status,
            status: Some(status),
            rate_limited: status == 429,
        }
    }

    pub fn captcha() -> Self {
        Self {
            kind: SoftFailureKind::Captcha,
            status: None,
            rate_limited: true,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl std::fmt::Display for SoftFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SoftFailureKind::Status => match self.status {
                Some(429) => write!(f, "Rate limited (HTTP 429)"),
                Some(status) => write!(f, "Server returned status code {}", status),
                None => write!(f, "Server returned an error status"),
            },
            SoftFailureKind::WrongContentType(content_type) => {
                write!(f, "Response is not a PDF: {}", content_type)
            }
            SoftFailureKind::NotAPdf => write!(f, "Downloaded data is not a valid PDF"),
            SoftFailureKind::EmptyBody => write!(f, "No PDF data received"),
            SoftFailureKind::NoEmbeddedDocument => write!(f, "No embedded PDF found on landing page"),
            SoftFailureKind::Captcha => write!(f, "Captcha required (rate limited)"),
        }
    }
}

/// Terminal failure of a resolution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// No mirror could be found, even after a refresh
    #[error("No available servers: {0}")]
    NoAvailableServers(String),

    /// The outer attempt budget ran out; carries the last observed cause
    #[error("Failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// A page could not be read as HTML at all
    #[error(transparent)]
    Malformed(#[from] ExtractError),

    /// The identifier could not be turned into a request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Outcome of one failed attempt, before the outer loop decides what to do
#[derive(Debug)]
pub(crate) enum AttemptError {
    Transport(FetchError),
    Soft(SoftFailure),
    Hard(ResolutionError),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Transport(e) => write!(f, "{}", e),
            AttemptError::Soft(failure) => write!(f, "{}", failure),
            AttemptError::Hard(e) => write!(f, "{}", e),
        }
    }
}

impl Retryable for AttemptError {
    fn is_retryable(&self) -> bool {
        !matches!(self, AttemptError::Hard(_))
    }
}

impl From<FetchError> for AttemptError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(url) => AttemptError::Hard(ResolutionError::InvalidRequest(url)),
            FetchError::Http(status) => AttemptError::Soft(SoftFailure::from_status(status)),
            other => AttemptError::Transport(other),
        }
    }
}

impl From<SoftFailure> for AttemptError {
    fn from(failure: SoftFailure) -> Self {
        AttemptError::Soft(failure)
    }
}

impl From<ExtractError> for AttemptError {
    fn from(err: ExtractError) -> Self {
        AttemptError::Hard(ResolutionError::Malformed(err))
    }
}

impl From<ResolutionError> for AttemptError {
    fn from(err: ResolutionError) -> Self {
        AttemptError::Hard(err)
    }
}
