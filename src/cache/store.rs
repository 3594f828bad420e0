//! Time-bounded store for the rendered index page.
//!
//! Holds exactly one entry. It is filled on the first miss, served until its
//! time-to-live runs out and dropped early only by [`ResponseCache::clear`];
//! writes to posts do not touch it, so the page may lag behind the data for up
//! to one TTL.

use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const INDEX_CACHE_HITS_METRIC: &str = "blogroll_index_cache_hits_total";
pub const INDEX_CACHE_MISSES_METRIC: &str = "blogroll_index_cache_misses_total";
pub const INDEX_CACHE_CLEARS_METRIC: &str = "blogroll_index_cache_clears_total";

/// A fully buffered response that can be replayed.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        response
    }
}

#[derive(Debug, Clone)]
struct Entry {
    response: CachedResponse,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entry: RwLock<Option<Entry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The stored response, unless it has expired.
    pub fn get(&self) -> Option<CachedResponse> {
        let guard = rw_read(&self.entry, SOURCE, "get");
        let entry = guard.as_ref()?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.response.clone())
    }

    /// Replace the stored response; concurrent fills are last-writer-wins.
    pub fn put(&self, response: CachedResponse) {
        *rw_write(&self.entry, SOURCE, "put") = Some(Entry {
            response,
            stored_at: Instant::now(),
        });
    }

    /// Serve the stored response, or render, store and return a fresh one.
    ///
    /// Render failures are passed through and leave the cache untouched.
    pub async fn get_or_render<F, Fut, E>(&self, render: F) -> Result<CachedResponse, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedResponse, E>>,
    {
        if let Some(hit) = self.get() {
            counter!(INDEX_CACHE_HITS_METRIC).increment(1);
            debug!(target = SOURCE, outcome = "hit", "serving cached index page");
            return Ok(hit);
        }

        counter!(INDEX_CACHE_MISSES_METRIC).increment(1);
        debug!(target = SOURCE, outcome = "miss", "rendering index page");
        let fresh = render().await?;
        self.put(fresh.clone());
        Ok(fresh)
    }

    /// Drop the stored response so the next request renders afresh.
    pub fn clear(&self) {
        counter!(INDEX_CACHE_CLEARS_METRIC).increment(1);
        *rw_write(&self.entry, SOURCE, "clear") = None;
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }
}
