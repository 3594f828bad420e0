mod auth;
mod follow;
mod middleware;
mod posts;
mod public;
mod session;

pub use public::build_router;
pub use session::{AUTHOR_SESSION_KEY, SignedIn, Viewer, login_redirect, safe_next};

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};

use crate::application::{
    accounts::{AccountService, HashingCost},
    error::{AppError, ErrorReport},
    feed::FeedService,
    follow::FollowService,
    posts::PostService,
    repos::{AuthorsRepo, RepoError, Repositories, StoreHealth},
};
use crate::cache::{CacheConfig, ResponseCache};
use crate::config::Settings;
use crate::infra::{error::InfraError, uploads::UploadStorage};

/// Shared state for every public route.
#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub follows: Arc<FollowService>,
    pub posts: Arc<PostService>,
    pub accounts: Arc<AccountService>,
    pub authors: Arc<dyn AuthorsRepo>,
    pub health: Arc<dyn StoreHealth>,
    pub uploads: Arc<UploadStorage>,
    /// Present when the index page cache is enabled.
    pub index_cache: Option<Arc<ResponseCache>>,
    pub sessions: SessionSettings,
    pub max_request_bytes: usize,
}

/// Session cookie behaviour.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub inactivity: Duration,
    pub secure_cookies: bool,
}

impl HttpState {
    /// Wire every service over a single repository backend.
    pub fn from_settings<R: Repositories>(
        repositories: Arc<R>,
        settings: &Settings,
    ) -> Result<Self, AppError> {
        let uploads = UploadStorage::new(settings.uploads.directory.clone())
            .map(Arc::new)
            .map_err(InfraError::from)?;
        let accounts = AccountService::new(repositories.clone(), HashingCost::from(&settings.auth))
            .map_err(|err| AppError::unexpected(err.to_string()))?;

        let cache = CacheConfig::from(&settings.cache);
        let index_cache = cache
            .is_enabled()
            .then(|| Arc::new(ResponseCache::new(cache.index_ttl())));

        Ok(Self {
            feed: Arc::new(FeedService::new(
                repositories.clone(),
                repositories.clone(),
                repositories.clone(),
                repositories.clone(),
                settings.feed.page_size,
            )),
            follows: Arc::new(FollowService::new(
                repositories.clone(),
                repositories.clone(),
            )),
            posts: Arc::new(PostService::new(
                repositories.clone(),
                repositories.clone(),
                repositories.clone(),
                repositories.clone(),
                repositories.clone(),
                uploads.clone(),
            )),
            accounts: Arc::new(accounts),
            authors: repositories.clone(),
            health: repositories,
            uploads,
            index_cache,
            sessions: SessionSettings {
                inactivity: settings.auth.session_inactivity,
                secure_cookies: settings.auth.secure_cookies,
            },
            max_request_bytes: usize::try_from(settings.uploads.max_request_bytes.get())
                .unwrap_or(usize::MAX),
        })
    }
}

/// 302 Found pointing at `location`.
pub(crate) fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::FOUND, [(LOCATION, HeaderValue::from_static("/"))]).into_response(),
    }
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
