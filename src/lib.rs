//! # paperfetch
//!
//! Resolve scholarly-paper identifiers (DOIs, PubMed ids, arXiv references
//! and URLs) to PDF files, through a rotating set of mirror hosts.
//!
//! ## Architecture
//!
//! - [`models`]: identifiers, resolution results and search records
//! - [`fetch`]: the [`Fetch`] seam and its reqwest implementation, with transport retry
//! - [`extract`]: pulling PDF locations and mirror links out of HTML
//! - [`mirror`]: discovery and rotation of mirror hosts
//! - [`resolver`]: the resolution engine, with its own outer retry loop
//! - [`search`]: bibliographic search via Semantic Scholar
//! - [`storage`]: writing PDFs to disk
//! - [`config`]: layered configuration
//! - [`utils`]: HTTP client, retry policy and PDF validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use paperfetch::{Config, Resolver};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = Resolver::new(&Config::default())?;
//! let artifact = resolver.resolve("10.48550/arXiv.1706.03762").await?;
//! println!("{} ({} bytes)", artifact.filename(), artifact.content().len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod extract;
pub mod fetch;
pub mod mirror;
pub mod models;
pub mod resolver;
pub mod search;
pub mod storage;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{Fetch, FetchError, HttpFetcher};
pub use mirror::{MirrorDirectory, MirrorSet};
pub use models::{classify, IdentifierClass, Paper, RetrievedArtifact, SearchResult};
pub use resolver::{ResolutionError, Resolver};
pub use search::{SearchError, SemanticScholar};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
