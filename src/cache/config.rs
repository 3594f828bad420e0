//! Index cache configuration.

use std::{num::NonZeroU64, time::Duration};

use crate::config::CacheSettings;

/// Settings for the rendered index page cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Serve `GET /` from the response cache.
    pub enable_index_cache: bool,
    /// How long a rendered index page is served before it is rebuilt.
    pub index_ttl_seconds: NonZeroU64,
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enable_index_cache: settings.enable_index_cache,
            index_ttl_seconds: settings.index_ttl_seconds,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enable_index_cache
    }

    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_seconds.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(enable_index_cache: bool, ttl: u64) -> CacheSettings {
        CacheSettings {
            enable_index_cache,
            index_ttl_seconds: NonZeroU64::new(ttl).expect("non-zero ttl"),
        }
    }

    #[test]
    fn follows_settings() {
        let config = CacheConfig::from(&settings(true, 20));
        assert!(config.is_enabled());
        assert_eq!(config.index_ttl(), Duration::from_secs(20));
    }

    #[test]
    fn flag_disables_cache() {
        let config = CacheConfig::from(&settings(false, 45));
        assert!(!config.is_enabled());
        assert_eq!(config.index_ttl(), Duration::from_secs(45));
    }
}
