use std::{convert::Infallible, io::ErrorKind};

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, FromRequestParts, Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        request::Parts,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use tower_sessions::{
    Expiry, MemoryStore, SessionManagerLayer,
    cookie::{SameSite, time::Duration as CookieDuration},
};
use tracing::error;

use super::{
    HttpState, SessionSettings, auth, db_health_response, follow,
    middleware::{log_responses, set_request_context},
    posts,
    session::Viewer,
};
use crate::{
    application::{error::HttpError, feed::FeedScope, pagination::PAGE_PARAM},
    cache::{CacheState, index_cache_layer},
    domain::entities::PostId,
    infra::uploads::{UploadStorageError, content_type_for},
    presentation::views::{
        AboutAuthorTemplate, AboutTechTemplate, FeedView, GroupContent, GroupTemplate,
        IndexContent, IndexTemplate, LayoutChrome, LayoutContext, PostDetailContent,
        PostDetailTemplate, ProfileContent, ProfileTemplate, render_not_found_response,
        render_template_response,
    },
};

pub fn build_router(state: HttpState) -> Router {
    // Only the bare index sits behind the response cache.
    let index = Router::new().route("/", get(index));
    let index = match state.index_cache.clone() {
        Some(cache) => index.route_layer(middleware::from_fn_with_state(
            CacheState::new(cache),
            index_cache_layer,
        )),
        None => index,
    };

    let session_layer = session_layer(state.sessions);
    let body_limit = DefaultBodyLimit::max(state.max_request_bytes);

    index
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{id}/", get(post_detail))
        .route("/about/author/", get(about_author))
        .route("/about/tech/", get(about_tech))
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(db_health))
        .merge(posts::routes())
        .merge(follow::routes())
        .merge(auth::routes())
        .fallback(fallback)
        .with_state(state)
        .layer(body_limit)
        .layer(session_layer)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

fn session_layer(settings: SessionSettings) -> SessionManagerLayer<MemoryStore> {
    let inactivity = CookieDuration::try_from(settings.inactivity).unwrap_or(CookieDuration::MAX);
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(settings.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(inactivity))
}

/// The raw `page` parameter. A repeated key keeps its last value and an
/// unparsable query string counts as no page at all.
#[derive(Debug, Default)]
pub(super) struct PageQuery {
    pub(super) page: Option<String>,
}

impl PageQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let page = pairs
            .into_iter()
            .filter(|(key, _)| key == PAGE_PARAM)
            .map(|(_, value)| value)
            .last();
        Self { page }
    }
}

impl<S> FromRequestParts<S> for PageQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(pairs)| Self::from_pairs(pairs))
            .unwrap_or_default())
    }
}

/// Post ids outside the integer range simply do not exist.
pub(super) fn parse_post_id(raw: &str) -> Result<PostId, HttpError> {
    raw.parse::<PostId>().map_err(|_| {
        HttpError::not_found(
            "infra::http::public::parse_post_id",
            format!("`{raw}` is not a post id"),
        )
    })
}

/// The index is rendered identically for every visitor so it can be cached.
async fn index(
    State(state): State<HttpState>,
    query: PageQuery,
) -> Result<Response, HttpError> {
    let page = state
        .feed
        .feed_page(&FeedScope::Global, None, query.page.as_deref())
        .await?;
    let content = IndexContent {
        feed: FeedView::new("/", &page),
    };
    let view = LayoutContext::new(LayoutChrome::shared("Latest posts"), content);
    Ok(render_template_response(IndexTemplate { view }, StatusCode::OK))
}

async fn group_posts(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    query: PageQuery,
) -> Result<Response, HttpError> {
    let page = state
        .feed
        .feed_page(&FeedScope::Group(slug), viewer.id(), query.page.as_deref())
        .await?;
    let content = GroupContent::from_page(&page).ok_or_else(|| unexpected_subject("group_posts"))?;
    let chrome = LayoutChrome::for_viewer(viewer.author(), content.group.title.clone());
    let view = LayoutContext::new(chrome, content);
    Ok(render_template_response(GroupTemplate { view }, StatusCode::OK))
}

async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    query: PageQuery,
) -> Result<Response, HttpError> {
    let page = state
        .feed
        .feed_page(
            &FeedScope::Author(username),
            viewer.id(),
            query.page.as_deref(),
        )
        .await?;
    let content = ProfileContent::from_page(&page, viewer.author().is_some())
        .ok_or_else(|| unexpected_subject("profile"))?;
    let title = format!("Profile of {}", content.profile.display_name);
    let view = LayoutContext::new(LayoutChrome::for_viewer(viewer.author(), title), content);
    Ok(render_template_response(ProfileTemplate { view }, StatusCode::OK))
}

async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let id = parse_post_id(&id)?;
    let detail = state.posts.detail(id).await?;
    let content = PostDetailContent::new(&detail, viewer.author());
    let title = format!("Post {}", detail.post.excerpt());
    let view = LayoutContext::new(LayoutChrome::for_viewer(viewer.author(), title), content);
    Ok(render_template_response(
        PostDetailTemplate { view },
        StatusCode::OK,
    ))
}

async fn about_author(viewer: Viewer) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.author(), "About the author");
    let view = LayoutContext::new(chrome, ());
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

async fn about_tech(viewer: Viewer) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.author(), "Technologies");
    let view = LayoutContext::new(chrome, ());
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.uploads.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => {
            HttpError::not_found(SOURCE, "the requested upload path is invalid").into_response()
        }
        Err(UploadStorageError::Io(err))
            if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) =>
        {
            HttpError::not_found(SOURCE, "the requested upload is not available").into_response()
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
                &err,
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type_for(path)) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn fallback() -> Response {
    render_not_found_response()
}

fn unexpected_subject(handler: &str) -> HttpError {
    HttpError::new(
        "infra::http::public",
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        format!("{handler} resolved a feed for a different subject"),
    )
}
