//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `PAPERFETCH_*` environment variables (sections separated by `__`,
//! e.g. `PAPERFETCH_NETWORK__TIMEOUT_SECS=60`), then CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [network]
//! timeout_secs = 30
//! max_retries = 3
//! fetch_retries = 3
//! backoff_base_ms = 1000
//! user_agent = "Mozilla/5.0 (X11; Linux x86_64; rv:27.0) Gecko/20100101 Firefox/27.0"
//!
//! [mirrors]
//! listing_url = "https://sci-hub.now.sh/"
//! domain_fragment = "sci-hub."
//! seed = ["https://sci-hub.se"]
//!
//! [arxiv]
//! pdf_base = "https://arxiv.org/pdf"
//!
//! [search]
//! api_key = "your-semantic-scholar-key"
//! default_limit = 10
//!
//! [downloads]
//! directory = "./downloads"
//! concurrency = 4
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::RetryPolicy;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "PAPERFETCH";

/// Browser-like user agent sent to mirrors
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:27.0) Gecko/20100101 Firefox/27.0";

/// User agent sent on the direct arXiv path
pub const DEFAULT_ARXIV_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Timeouts, user agent and retry budgets
    #[serde(default)]
    pub network: NetworkConfig,

    /// Mirror discovery
    #[serde(default)]
    pub mirrors: MirrorConfig,

    /// Direct arXiv downloads
    #[serde(default)]
    pub arxiv: ArxivConfig,

    /// Bibliographic search
    #[serde(default)]
    pub search: SearchConfig,

    /// Where and how many papers to download
    #[serde(default)]
    pub downloads: DownloadConfig,
}

impl Config {
    /// Retry policy for a single fetch (transport failures only)
    pub fn fetch_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.network.fetch_retries, self.network.backoff_base())
    }

    /// Retry policy for a whole resolution
    pub fn resolve_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.network.max_retries, self.network.backoff_base())
    }
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// User agent sent to mirrors
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Attempts per resolution
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Attempts per HTTP request on transport failure
    #[serde(default = "default_retries")]
    pub fetch_retries: u32,

    /// Backoff base in milliseconds; attempt n waits base * 2^n
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
            max_retries: default_retries(),
            fetch_retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl NetworkConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

/// Mirror discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Page listing the currently reachable mirrors
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// Substring a link must contain to count as a mirror
    #[serde(default = "default_domain_fragment")]
    pub domain_fragment: String,

    /// Mirrors to use before the first refresh
    #[serde(default)]
    pub seed: Vec<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            domain_fragment: default_domain_fragment(),
            seed: Vec::new(),
        }
    }
}

fn default_listing_url() -> String {
    "https://sci-hub.now.sh/".to_string()
}

fn default_domain_fragment() -> String {
    "sci-hub.".to_string()
}

/// Direct arXiv download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArxivConfig {
    /// Base of the PDF endpoint; `/{id}.pdf` is appended
    #[serde(default = "default_arxiv_pdf_base")]
    pub pdf_base: String,

    /// Accept header forced on arXiv requests
    #[serde(default = "default_arxiv_accept")]
    pub accept: String,

    /// User agent for arXiv requests
    #[serde(default = "default_arxiv_user_agent")]
    pub user_agent: String,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            pdf_base: default_arxiv_pdf_base(),
            accept: default_arxiv_accept(),
            user_agent: default_arxiv_user_agent(),
        }
    }
}

fn default_arxiv_pdf_base() -> String {
    "https://arxiv.org/pdf".to_string()
}

fn default_arxiv_accept() -> String {
    "application/pdf".to_string()
}

fn default_arxiv_user_agent() -> String {
    DEFAULT_ARXIV_USER_AGENT.to_string()
}

/// Bibliographic search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Semantic Scholar Graph API base
    #[serde(default = "default_search_api_base")]
    pub api_base: String,

    /// Semantic Scholar API key (optional, for higher rate limits)
    #[serde(default = "default_search_api_key")]
    pub api_key: Option<String>,

    /// Results returned when no limit is given
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: default_search_api_base(),
            api_key: default_search_api_key(),
            default_limit: default_search_limit(),
        }
    }
}

fn default_search_api_base() -> String {
    "https://api.semanticscholar.org/graph/v1".to_string()
}

fn default_search_api_key() -> Option<String> {
    std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok()
}

fn default_search_limit() -> usize {
    10
}

/// Download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory PDFs are written to
    #[serde(default = "default_download_dir")]
    pub directory: PathBuf,

    /// Resolutions running at once in batch mode
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_concurrency() -> usize {
    4
}

/// Load configuration from a file, with environment overrides on top
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}

/// Load configuration from the environment alone
pub fn load_env_config() -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}

/// Find a configuration file in the default locations.
///
/// Looks for `./paperfetch.toml`, then `<config dir>/paperfetch/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("paperfetch.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("paperfetch").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.timeout_secs, 30);
        assert_eq!(config.network.max_retries, 3);
        assert_eq!(config.network.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.mirrors.domain_fragment, "sci-hub.");
        assert!(config.mirrors.seed.is_empty());
        assert_eq!(config.arxiv.pdf_base, "https://arxiv.org/pdf");
        assert_eq!(config.arxiv.accept, "application/pdf");
    }

    #[test]
    fn test_retry_policies_follow_network_section() {
        let mut config = Config::default();
        config.network.max_retries = 5;
        config.network.fetch_retries = 2;
        config.network.backoff_base_ms = 10;

        let outer = config.resolve_retry_policy();
        let inner = config.fetch_retry_policy();
        assert_eq!(outer.max_attempts, 5);
        assert_eq!(inner.max_attempts, 2);
        assert_eq!(outer.delay_for(1), Duration::from_millis(20));
    }

    #[test]
    fn test_load_partial_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paperfetch.toml");

        std::fs::write(
            &path,
            r#"
[network]
timeout_secs = 90
max_retries = 5

[mirrors]
seed = ["https://sci-hub.se", "https://sci-hub.st"]

[downloads]
directory = "/tmp/papers"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.network.timeout_secs, 90);
        assert_eq!(config.network.max_retries, 5);
        // Untouched fields keep their defaults
        assert_eq!(config.network.fetch_retries, 3);
        assert_eq!(config.mirrors.listing_url, "https://sci-hub.now.sh/");
        assert_eq!(config.mirrors.seed.len(), 2);
        assert_eq!(config.downloads.directory, PathBuf::from("/tmp/papers"));
        assert_eq!(config.downloads.concurrency, 4);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = load_config(Path::new("/nonexistent/paperfetch.toml"));
        assert!(result.is_err());
    }
}
