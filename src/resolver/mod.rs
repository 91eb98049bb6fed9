//! The resolution engine.
//!
//! [`Resolver::resolve`] turns an identifier into a [`RetrievedArtifact`]:
//!
//! 1. The identifier is routed once: arXiv references go straight to the
//!    arXiv PDF endpoint, everything else is appended to the current mirror.
//! 2. Each attempt fetches the target (the fetcher retries transport
//!    failures on its own), follows a landing page to its embedded PDF at
//!    most once, and validates what came back.
//! 3. Attempts that fail softly or on transport are retried by an outer
//!    loop with its own budget and backoff. A soft failure that is not rate
//!    limiting also moves the directory to the next mirror.
//!
//! Missing mirrors, unparseable pages and unbuildable URLs end the
//! resolution at once.

mod failure;
mod route;

pub use failure::{ResolutionError, SoftFailure, SoftFailureKind};
pub use route::Route;

use failure::AttemptError;
use futures_util::{stream, StreamExt};
use std::sync::Arc;

use crate::config::{ArxivConfig, Config};
use crate::extract;
use crate::fetch::{Fetch, FetchError, FetchRequest, FetchResponse, HttpFetcher};
use crate::mirror::{MirrorDirectory, MirrorSet};
use crate::models::{filename_for_arxiv, filename_for_identifier, RetrievedArtifact, ValidationVerdict};
use crate::utils::{has_pdf_magic, is_html_content_type, validate, with_retry, RetryError, RetryPolicy};

/// Resolves paper identifiers to PDFs
#[derive(Debug, Clone)]
pub struct Resolver {
    fetcher: Arc<dyn Fetch>,
    mirrors: Arc<MirrorDirectory>,
    policy: RetryPolicy,
    user_agent: String,
    arxiv: ArxivConfig,
}

impl Resolver {
    /// Create a resolver backed by a real HTTP client
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(config)?);
        Ok(Self::with_fetcher(fetcher, config))
    }

    /// Create a resolver over any [`Fetch`] implementation
    pub fn with_fetcher(fetcher: Arc<dyn Fetch>, config: &Config) -> Self {
        let mirrors = Arc::new(MirrorDirectory::new(Arc::clone(&fetcher), &config.mirrors));
        Self {
            fetcher,
            mirrors,
            policy: config.resolve_retry_policy(),
            user_agent: config.network.user_agent.clone(),
            arxiv: config.arxiv.clone(),
        }
    }

    /// The mirror directory shared by every resolution
    pub fn mirrors(&self) -> &Arc<MirrorDirectory> {
        &self.mirrors
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Resolve one identifier.
    ///
    /// Attempts are strictly sequential. Dropping the returned future at any
    /// await point leaves the mirror directory with either the old or the new
    /// set, never a mix.
    pub async fn resolve(&self, identifier: &str) -> Result<RetrievedArtifact, ResolutionError> {
        let route = Route::for_identifier(identifier, &self.arxiv);
        tracing::debug!("Resolving {} via {:?}", identifier, route);
        if route.is_doubtful_doi() {
            tracing::warn!("'{}' does not look like a DOI; trying anyway", identifier);
        }

        let result = with_retry(self.policy, |attempt| {
            tracing::debug!("Resolution attempt {} for {}", attempt, identifier);
            self.attempt(&route)
        })
        .await;

        match result {
            Ok(artifact) => {
                tracing::info!(
                    "Resolved {} from {} ({} bytes)",
                    identifier,
                    artifact.source_url(),
                    artifact.content().len()
                );
                Ok(artifact)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                tracing::warn!("Giving up on {} after {} attempts: {}", identifier, attempts, last);
                Err(ResolutionError::RetriesExhausted {
                    attempts,
                    last: last.to_string(),
                })
            }
            Err(RetryError::Permanent(AttemptError::Hard(error))) => {
                tracing::warn!("Resolution of {} failed: {}", identifier, error);
                Err(error)
            }
            Err(RetryError::Permanent(other)) => Err(ResolutionError::RetriesExhausted {
                attempts: 1,
                last: other.to_string(),
            }),
        }
    }

    /// Resolve many identifiers, at most `concurrency` at a time.
    ///
    /// One artifact per identifier, in input order; failures come back as
    /// artifacts carrying a soft error.
    pub async fn resolve_batch(&self, identifiers: &[String], concurrency: usize) -> Vec<RetrievedArtifact> {
        self.resolve_batch_with_progress(identifiers, concurrency, |_| {})
            .await
    }

    /// [`resolve_batch`](Self::resolve_batch), calling `on_done` as each resolution finishes
    pub async fn resolve_batch_with_progress<F>(
        &self,
        identifiers: &[String],
        concurrency: usize,
        on_done: F,
    ) -> Vec<RetrievedArtifact>
    where
        F: Fn(&RetrievedArtifact),
    {
        let on_done = &on_done;
        stream::iter(identifiers)
            .map(|identifier| async move {
                let artifact = match self.resolve(identifier).await {
                    Ok(artifact) => artifact,
                    Err(error) => RetrievedArtifact::failed(identifier.as_str(), error.to_string()),
                };
                on_done(&artifact);
                artifact
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    async fn attempt(&self, route: &Route) -> Result<RetrievedArtifact, AttemptError> {
        match route {
            Route::Direct { arxiv_id, url } => self.attempt_direct(arxiv_id, url).await,
            Route::Mirrored { identifier, .. } => self.attempt_mirrored(identifier).await,
        }
    }

    async fn attempt_direct(&self, arxiv_id: &str, url: &str) -> Result<RetrievedArtifact, AttemptError> {
        let request = FetchRequest::get(url)
            .header("User-Agent", self.arxiv.user_agent.as_str())
            .header("Accept", self.arxiv.accept.as_str());

        let response = self.fetcher.fetch(&request).await?;
        let body = accept_pdf(response).map_err(|failure| {
            tracing::warn!("arXiv returned no PDF for {}: {}", arxiv_id, failure);
            failure
        })?;

        Ok(RetrievedArtifact::success(body, url, filename_for_arxiv(arxiv_id)))
    }

    async fn attempt_mirrored(&self, identifier: &str) -> Result<RetrievedArtifact, AttemptError> {
        let snapshot = self.usable_mirrors().await?;
        let base = snapshot
            .base_url()
            .ok_or_else(|| ResolutionError::NoAvailableServers("mirror list is empty".to_string()))?;

        let url = Route::mirrored_url(&base, identifier)
            .map_err(|e| ResolutionError::InvalidRequest(format!("{}{}: {}", base, identifier, e)))?;

        match self.fetch_from_mirror(&url).await {
            Ok((source_url, body)) => Ok(RetrievedArtifact::success(
                body,
                source_url,
                filename_for_identifier(identifier),
            )),
            Err(error) => {
                let rotate = match &error {
                    AttemptError::Soft(failure) => !failure.rate_limited,
                    AttemptError::Transport(_) => true,
                    AttemptError::Hard(_) => false,
                };
                tracing::warn!("Mirror {} failed for {}: {}", base, identifier, error);
                if rotate {
                    self.mirrors.rotate(snapshot.version());
                }
                Err(error)
            }
        }
    }

    /// Current mirror set, refreshed once if nothing is known yet
    async fn usable_mirrors(&self) -> Result<Arc<MirrorSet>, ResolutionError> {
        let snapshot = self.mirrors.snapshot();
        if !snapshot.is_empty() {
            return Ok(snapshot);
        }

        tracing::debug!("No mirror known, refreshing");
        let refreshed = self
            .mirrors
            .refresh_if_unchanged(snapshot.version())
            .await
            .map_err(|e| ResolutionError::NoAvailableServers(e.to_string()))?;

        if refreshed.is_empty() {
            return Err(ResolutionError::NoAvailableServers(
                "no mirrors discovered".to_string(),
            ));
        }
        Ok(refreshed)
    }

    fn mirror_request(&self, url: &str) -> FetchRequest {
        FetchRequest::get(url).header("User-Agent", self.user_agent.as_str())
    }

    /// Fetch `url`, following a landing page to its embedded PDF once.
    ///
    /// Returns the URL the PDF actually came from along with its bytes.
    async fn fetch_from_mirror(&self, url: &str) -> Result<(String, Vec<u8>), AttemptError> {
        let response = self.fetcher.fetch(&self.mirror_request(url)).await?;

        if !is_landing_page(&response) {
            let body = accept_pdf(response)?;
            return Ok((url.to_string(), body));
        }

        let target = landing_page_target(&response)?;
        tracing::debug!("Following embedded document {}", target);

        let embedded = self.fetcher.fetch(&self.mirror_request(&target)).await?;
        let body = accept_pdf(embedded)?;
        Ok((target, body))
    }
}

/// A successful HTML response that is not secretly a PDF
fn is_landing_page(response: &FetchResponse) -> bool {
    response.is_success()
        && !response.body.is_empty()
        && !has_pdf_magic(&response.body)
        && response.content_type().is_some_and(is_html_content_type)
}

/// Absolute URL of the PDF embedded in a landing page
fn landing_page_target(response: &FetchResponse) -> Result<String, AttemptError> {
    if extract::is_captcha(&response.body)? {
        return Err(SoftFailure::captcha().with_status(response.status).into());
    }

    let target = extract::embedded_document(&response.body)?.ok_or_else(|| {
        SoftFailure::new(SoftFailureKind::NoEmbeddedDocument).with_status(response.status)
    })?;

    let absolute = url::Url::parse(&response.url)
        .and_then(|base| base.join(&target))
        .map_err(|e| ResolutionError::InvalidRequest(format!("{}: {}", target, e)))?;

    Ok(absolute.to_string())
}

/// Body of `response` if it is a usable PDF
fn accept_pdf(response: FetchResponse) -> Result<Vec<u8>, SoftFailure> {
    if !response.is_success() {
        return Err(SoftFailure::from_status(response.status));
    }
    if response.body.is_empty() {
        return Err(SoftFailure::new(SoftFailureKind::EmptyBody).with_status(response.status));
    }

    match validate(response.content_type(), &response.body) {
        ValidationVerdict::Valid => Ok(response.body),
        ValidationVerdict::WrongContentType(content_type) => {
            Err(SoftFailure::new(SoftFailureKind::WrongContentType(content_type)).with_status(response.status))
        }
        ValidationVerdict::NotAPdf => {
            Err(SoftFailure::new(SoftFailureKind::NotAPdf).with_status(response.status))
        }
    }
}
