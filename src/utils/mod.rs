//! Utility modules shared by the fetcher, the resolver and the CLI.
//!
//! - [`HttpClient`]: configured reqwest client
//! - [`RetryPolicy`] and [`with_retry`]: bounded retry with exponential backoff
//! - [`validate`]: decide whether a response body is a PDF
//! - [`hashed_filename`]: content-addressed file names
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use paperfetch::utils::{with_retry, RetryPolicy, Retryable};
//!
//! #[derive(Debug)]
//! struct Flaky;
//! impl std::fmt::Display for Flaky {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "flaky")
//!     }
//! }
//! impl Retryable for Flaky {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let policy = RetryPolicy::new(3, Duration::from_millis(100));
//! let result = with_retry(policy, |attempt| async move {
//!     if attempt < 2 { Err(Flaky) } else { Ok(attempt) }
//! })
//! .await;
//! assert_eq!(result.ok(), Some(2));
//! # }
//! ```

mod http;
mod pdf;
mod retry;

pub use http::HttpClient;
pub use pdf::{
    has_pdf_magic, hashed_filename, is_ambiguous_content_type, is_html_content_type,
    is_pdf_content_type, validate, PDF_MAGIC,
};
pub use retry::{
    with_retry, RetryError, RetryPolicy, Retryable, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS,
};
