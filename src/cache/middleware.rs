//! Response cache middleware for the unparameterised index page.
//!
//! Only a bare `GET /` is cached. Paged (`/?page=2`) and every other request
//! pass straight through to the handler.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, header},
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;
use tracing::{instrument, warn};

use super::store::{CachedResponse, ResponseCache};

/// Shared index cache handle for the middleware.
#[derive(Clone)]
pub struct CacheState {
    pub index: Arc<ResponseCache>,
}

impl CacheState {
    pub fn new(index: Arc<ResponseCache>) -> Self {
        Self { index }
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn index_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_cacheable_request(&request) {
        return next.run(request).await;
    }

    let result = cache
        .index
        .get_or_render(move || async move {
            let response = next.run(request).await;
            if !should_store_response(&response) {
                return Err(response);
            }
            buffer_response(response).await
        })
        .await;

    match result {
        Ok(cached) => cached.into_response(),
        Err(live) => live,
    }
}

fn is_cacheable_request(request: &Request<Body>) -> bool {
    request.method() == Method::GET && request.uri().path() == "/" && request.uri().query().is_none()
}

/// Only successful, cookie-free HTML responses are shared between viewers.
pub fn should_store_response(response: &Response) -> bool {
    if !response.status().is_success() {
        return false;
    }

    if response.headers().contains_key(header::SET_COOKIE) {
        return false;
    }

    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"))
}

async fn buffer_response(response: Response) -> Result<CachedResponse, Response> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => Ok(CachedResponse::new(
            parts.status,
            &parts.headers,
            collected.to_bytes(),
        )),
        Err(error) => {
            warn!(error = %error, "failed to buffer index response");
            Err(Response::from_parts(parts, Body::empty()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use axum::response::IntoResponse;

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn only_bare_index_get_is_cacheable() {
        assert!(is_cacheable_request(&request(Method::GET, "/")));
        assert!(!is_cacheable_request(&request(Method::GET, "/?page=2")));
        assert!(!is_cacheable_request(&request(Method::GET, "/follow/")));
        assert!(!is_cacheable_request(&request(Method::POST, "/")));
    }

    #[test]
    fn skips_errors_and_cookies() {
        let html = axum::response::Html("<p>ok</p>").into_response();
        assert!(should_store_response(&html));

        let missing = (StatusCode::NOT_FOUND, axum::response::Html("no")).into_response();
        assert!(!should_store_response(&missing));

        let mut with_cookie = axum::response::Html("<p>ok</p>").into_response();
        with_cookie
            .headers_mut()
            .insert(header::SET_COOKIE, HeaderValue::from_static("id=1"));
        assert!(!should_store_response(&with_cookie));

        let plain = "text".into_response();
        assert!(!should_store_response(&plain));
    }
}
