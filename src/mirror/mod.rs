//! Discovery and selection of mirror hosts.
//!
//! The directory owns a single [`MirrorSet`] value. Readers take an
//! immutable snapshot (`Arc<MirrorSet>`) per use; writers replace the whole
//! value, bumping its version. Refreshes are serialized, and the new set is
//! only installed after the listing page has been fetched and parsed, so a
//! refresh that fails or is cancelled leaves the previous set in place.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::config::MirrorConfig;
use crate::extract::{self, ExtractError};
use crate::fetch::{Fetch, FetchError, FetchRequest};

/// Ordered list of interchangeable mirror base URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSet {
    version: u64,
    mirrors: Vec<String>,
    cursor: usize,
}

impl MirrorSet {
    /// Build a set from discovered URLs.
    ///
    /// Trailing slashes are trimmed and repeats dropped; order is kept.
    pub fn new(mirrors: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for mirror in mirrors {
            let mirror = mirror.trim().trim_end_matches('/').to_string();
            if !mirror.is_empty() && !unique.contains(&mirror) {
                unique.push(mirror);
            }
        }

        Self {
            version: 0,
            mirrors: unique,
            cursor: 0,
        }
    }

    /// Bumped on every replacement
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    /// The mirror requests should go to
    pub fn current(&self) -> Option<&str> {
        self.mirrors.get(self.cursor).map(String::as_str)
    }

    /// Current mirror as a base URL ready for an identifier to be appended
    pub fn base_url(&self) -> Option<String> {
        self.current().map(|mirror| format!("{}/", mirror))
    }

    fn successor(&self) -> Self {
        let cursor = if self.mirrors.is_empty() {
            0
        } else {
            (self.cursor + 1) % self.mirrors.len()
        };
        Self {
            version: self.version + 1,
            mirrors: self.mirrors.clone(),
            cursor,
        }
    }
}

/// Why a refresh could not produce a mirror list
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Failed to fetch mirror list: {0}")]
    Fetch(#[from] FetchError),

    #[error("Mirror list returned status {0}")]
    Status(u16),

    #[error("Failed to read mirror list: {0}")]
    Extract(#[from] ExtractError),
}

/// Shared holder of the current [`MirrorSet`]
#[derive(Debug)]
pub struct MirrorDirectory {
    fetcher: Arc<dyn Fetch>,
    listing_url: String,
    domain_fragment: String,
    state: watch::Sender<Arc<MirrorSet>>,
    refresh_lock: Mutex<()>,
}

impl MirrorDirectory {
    /// Create a directory, seeded with any statically configured mirrors
    pub fn new(fetcher: Arc<dyn Fetch>, config: &MirrorConfig) -> Self {
        let (state, _) = watch::channel(Arc::new(MirrorSet::new(config.seed.iter().cloned())));
        Self {
            fetcher,
            listing_url: config.listing_url.clone(),
            domain_fragment: config.domain_fragment.clone(),
            state,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Immutable view of the current set
    pub fn snapshot(&self) -> Arc<MirrorSet> {
        Arc::clone(&self.state.borrow())
    }

    /// Base URL of the current mirror, if any is known
    pub fn current_mirror(&self) -> Option<String> {
        self.snapshot().base_url()
    }

    /// Fetch the listing page and replace the mirror set.
    ///
    /// Always performs one round trip. An empty result is installed as-is:
    /// "no mirrors" is a valid state, not an error.
    pub async fn refresh(&self) -> Result<Arc<MirrorSet>, DiscoveryError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh unless the set has already moved past `seen_version`.
    ///
    /// Concurrent resolutions that all find the set empty end up sharing a
    /// single round trip: whoever gets the lock second sees the new version
    /// and returns it without fetching again.
    pub async fn refresh_if_unchanged(&self, seen_version: u64) -> Result<Arc<MirrorSet>, DiscoveryError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.snapshot();
        if current.version() != seen_version {
            tracing::debug!(
                "Mirror set already refreshed (v{} -> v{})",
                seen_version,
                current.version()
            );
            return Ok(current);
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Arc<MirrorSet>, DiscoveryError> {
        tracing::debug!("Fetching mirror list from {}", self.listing_url);

        let response = self
            .fetcher
            .fetch(&FetchRequest::get(&self.listing_url))
            .await?;

        if !response.is_success() {
            tracing::warn!("Mirror list returned status {}", response.status);
            return Err(DiscoveryError::Status(response.status));
        }

        let candidates = extract::mirror_candidates(&response.body, &self.domain_fragment)?;
        let installed = self.install(MirrorSet::new(candidates));

        if installed.is_empty() {
            tracing::warn!("No mirrors found at {}", self.listing_url);
        } else {
            tracing::info!(
                "Discovered {} mirrors, using {}",
                installed.len(),
                installed.current().unwrap_or_default()
            );
        }

        Ok(installed)
    }

    /// Replace the whole set, versioned after the one it supersedes
    fn install(&self, mut set: MirrorSet) -> Arc<MirrorSet> {
        let mut installed = Arc::new(MirrorSet::default());
        self.state.send_modify(|current| {
            set.version = current.version() + 1;
            installed = Arc::new(set);
            *current = Arc::clone(&installed);
        });
        installed
    }

    /// Move to the next mirror, unless someone already replaced `seen_version`
    pub fn rotate(&self, seen_version: u64) -> Arc<MirrorSet> {
        let rotated = self.state.send_if_modified(|current| {
            if current.version() != seen_version || current.len() < 2 {
                return false;
            }
            *current = Arc::new(current.successor());
            true
        });

        let snapshot = self.snapshot();
        if rotated {
            tracing::debug!(
                "Rotated to mirror {}",
                snapshot.current().unwrap_or_default()
            );
        }
        snapshot
    }
}
