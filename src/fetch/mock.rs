//! Scripted fetcher for testing purposes.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Fetch, FetchError, FetchRequest, FetchResponse};

type Outcome = Result<FetchResponse, FetchError>;

/// A fetcher that replays predefined outcomes per URL.
///
/// Queued outcomes for a URL are consumed first, in order; once the queue is
/// empty the URL's fallback (if any) is returned on every call. Unknown URLs
/// fail with a connection error. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockFetcher {
    queued: Mutex<HashMap<String, VecDeque<Outcome>>>,
    fallback: Mutex<HashMap<String, Outcome>>,
    requests: Mutex<Vec<FetchRequest>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot outcome for `url`
    pub fn enqueue(&self, url: &str, outcome: Outcome) -> &Self {
        locked(&self.queued)
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Outcome returned for `url` whenever nothing is queued
    pub fn always(&self, url: &str, outcome: Outcome) -> &Self {
        locked(&self.fallback).insert(url.to_string(), outcome);
        self
    }

    /// All requests seen so far
    pub fn requests(&self) -> Vec<FetchRequest> {
        locked(&self.requests).clone()
    }

    /// Number of requests made to `url`
    pub fn request_count(&self, url: &str) -> usize {
        locked(&self.requests)
            .iter()
            .filter(|request| request.url == url)
            .count()
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        locked(&self.requests).push(request.clone());

        if let Some(outcome) = locked(&self.queued)
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }

        match locked(&self.fallback).get(&request.url) {
            Some(outcome) => outcome.clone(),
            None => Err(FetchError::Connection(format!("no route to {}", request.url))),
        }
    }
}

/// A 200 response carrying a small valid PDF body
pub fn pdf_response(url: &str) -> FetchResponse {
    FetchResponse::new(url, 200, b"%PDF-1.4\n%mock\n".to_vec()).with_content_type("application/pdf")
}

/// A 200 HTML response
pub fn html_response(url: &str, html: &str) -> FetchResponse {
    FetchResponse::new(url, 200, html.as_bytes().to_vec()).with_content_type("text/html; charset=utf-8")
}
