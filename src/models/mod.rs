//! Core data models for identifiers, resolution results and search records.

mod artifact;
mod identifier;
mod paper;

pub use artifact::{filename_for_arxiv, filename_for_identifier, RetrievedArtifact, ValidationVerdict};
pub use identifier::{classify, is_arxiv, looks_like_doi, strip_arxiv_prefixes, IdentifierClass};
pub use paper::{Paper, PaperBuilder, SearchResult};
