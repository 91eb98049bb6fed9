//! Paper records produced by bibliographic search.

use serde::{Deserialize, Serialize};

/// A paper found by bibliographic search.
///
/// `url` is always something the resolver accepts as an identifier: a
/// `https://doi.org/...` link when a DOI is known, otherwise an arXiv
/// abstract page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Paper title
    pub title: String,

    /// Resolvable identifier URL
    pub url: String,

    /// Authors (semicolon-separated)
    pub authors: String,

    /// Publication year
    pub year: Option<String>,

    /// Venue or journal name
    pub venue: Option<String>,

    /// Digital Object Identifier
    pub doi: Option<String>,

    /// arXiv identifier
    pub arxiv_id: Option<String>,
}

impl Paper {
    /// Create a new paper with required fields
    pub fn new(title: String, url: String) -> Self {
        Self {
            title,
            url,
            authors: String::new(),
            year: None,
            venue: None,
            doi: None,
            arxiv_id: None,
        }
    }

    /// Returns the author names as a vector
    pub fn author_list(&self) -> Vec<&str> {
        self.authors
            .split(';')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Identifier to hand to the resolver
    pub fn identifier(&self) -> &str {
        &self.url
    }
}

/// Builder for constructing Paper objects
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    paper: Paper,
}

impl PaperBuilder {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            paper: Paper::new(title.into(), url.into()),
        }
    }

    pub fn authors(mut self, authors: impl Into<String>) -> Self {
        self.paper.authors = authors.into();
        self
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.paper.year = Some(year.into());
        self
    }

    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.paper.venue = Some(venue.into());
        self
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.paper.doi = Some(doi.into());
        self
    }

    pub fn arxiv_id(mut self, arxiv_id: impl Into<String>) -> Self {
        self.paper.arxiv_id = Some(arxiv_id.into());
        self
    }

    pub fn build(self) -> Paper {
        self.paper
    }
}

/// Result of a bibliographic search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// Papers found, in the order the search service ranked them
    pub papers: Vec<Paper>,

    /// Query after cleaning
    pub query: String,

    /// Set when nothing usable was found
    pub error: Option<String>,
}

impl SearchResult {
    pub fn new(papers: Vec<Paper>, query: impl Into<String>) -> Self {
        let error = papers.is_empty().then(|| "No results found".to_string());
        Self {
            papers,
            query: query.into(),
            error,
        }
    }
}
