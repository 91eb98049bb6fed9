//! Bibliographic search through the Semantic Scholar Graph API.
//!
//! Search only produces identifiers; downloading is the resolver's job.
//! Records without a DOI or arXiv id are dropped, since nothing downstream
//! could resolve them.

use serde::Deserialize;

use crate::config::{NetworkConfig, SearchConfig};
use crate::models::{Paper, PaperBuilder, SearchResult};
use crate::utils::HttpClient;

/// Fields requested for every hit
const SEARCH_FIELDS: &str = "title,authors,year,externalIds,publicationTypes,venue";

/// Errors from the search service
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search query is empty")]
    EmptyQuery,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by Semantic Scholar")]
    RateLimited,

    #[error("Server returned status code {0}")]
    Status(u16),

    #[error("Failed to parse search response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Parse(err.to_string())
    }
}

/// Semantic Scholar search client
#[derive(Debug, Clone)]
pub struct SemanticScholar {
    client: HttpClient,
    api_base: String,
    api_key: Option<String>,
    default_limit: usize,
}

impl SemanticScholar {
    /// Create a client from configuration
    pub fn new(search: &SearchConfig, network: &NetworkConfig) -> Result<Self, SearchError> {
        let client = HttpClient::new(network)?;
        Ok(Self::with_client(client, search))
    }

    /// Create with a custom HTTP client (for testing)
    pub fn with_client(client: HttpClient, search: &SearchConfig) -> Self {
        Self {
            client,
            api_base: search.api_base.trim_end_matches('/').to_string(),
            api_key: search.api_key.clone().filter(|key| !key.is_empty()),
            default_limit: search.default_limit,
        }
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Search for papers matching `query`, returning at most `limit` hits
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResult, SearchError> {
        let query = clean_query(query);
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let url = format!(
            "{}/paper/search?query={}&limit={}&fields={}&offset=0",
            self.api_base,
            urlencoding::encode(&query),
            limit.saturating_mul(2),
            SEARCH_FIELDS
        );
        tracing::debug!("Searching Semantic Scholar: {}", url);

        let mut request = self
            .client
            .client()
            .get(&url)
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            tracing::warn!("Semantic Scholar returned status {}", status);
            return Err(SearchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let data: S2SearchResponse = serde_json::from_slice(&body)?;
        tracing::debug!("Decoded {} papers", data.data.len());

        let papers: Vec<Paper> = data
            .data
            .into_iter()
            .filter_map(parse_paper)
            .take(limit)
            .collect();

        Ok(SearchResult::new(papers, query))
    }
}

/// Strip quotes and `.com`, which the search service handles poorly
fn clean_query(query: &str) -> String {
    query.replace('"', "").replace(".com", "").trim().to_string()
}

/// Map a hit to a [`Paper`]; hits without a resolvable id are skipped
fn parse_paper(data: S2Paper) -> Option<Paper> {
    let ids = data.external_ids.unwrap_or_default();
    let doi = ids.doi.filter(|doi| !doi.is_empty());
    let arxiv = ids.arxiv.filter(|arxiv| !arxiv.is_empty());

    let url = match (&doi, &arxiv) {
        (Some(doi), _) => format!("https://doi.org/{}", doi),
        (None, Some(arxiv)) => format!("https://arxiv.org/abs/{}", arxiv),
        (None, None) => return None,
    };

    let authors = data
        .authors
        .iter()
        .filter_map(|a| a.name.as_deref())
        .collect::<Vec<_>>()
        .join("; ");

    let mut builder = PaperBuilder::new(data.title, url).authors(authors);
    if let Some(year) = data.year {
        builder = builder.year(year.to_string());
    }
    if let Some(venue) = data.venue.filter(|v| !v.is_empty()) {
        builder = builder.venue(venue);
    }
    if let Some(doi) = doi {
        builder = builder.doi(doi);
    }
    if let Some(arxiv) = arxiv {
        builder = builder.arxiv_id(arxiv);
    }
    Some(builder.build())
}

// ===== Semantic Scholar API Types =====

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
struct S2Paper {
    title: String,
    year: Option<i32>,
    venue: Option<String>,
    #[serde(default)]
    authors: Vec<S2Author>,
    #[serde(rename = "externalIds")]
    external_ids: Option<S2ExternalIds>,
}

#[derive(Debug, Default, Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
}
