//! Response caching for the index page.
//!
//! The rendered `GET /` page is kept for a short time-to-live (20 seconds by
//! default) and shared between all viewers:
//!
//! ```toml
//! [cache]
//! enable_index_cache = true
//! index_ttl_seconds = 20
//! ```

mod config;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use middleware::{CacheState, index_cache_layer, should_store_response};
pub use store::{
    CachedResponse, INDEX_CACHE_CLEARS_METRIC, INDEX_CACHE_HITS_METRIC, INDEX_CACHE_MISSES_METRIC,
    ResponseCache,
};
