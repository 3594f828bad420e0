//! Follow feed and follow/unfollow actions.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::get,
};
use tracing::debug;

use super::{HttpState, found, public::PageQuery, session::SignedIn};
use crate::{
    application::{error::HttpError, feed::FeedScope},
    presentation::views::{
        FeedView, FollowContent, FollowTemplate, LayoutChrome, LayoutContext, profile_href,
        render_template_response,
    },
};

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/follow/", get(follow_index))
        .route("/profile/{username}/follow/", get(follow_author))
        .route("/profile/{username}/unfollow/", get(unfollow_author))
}

async fn follow_index(
    State(state): State<HttpState>,
    SignedIn(viewer): SignedIn,
    query: PageQuery,
) -> Result<Response, HttpError> {
    let page = state
        .feed
        .feed_page(&FeedScope::Followed, Some(viewer.id), query.page.as_deref())
        .await?;
    let content = FollowContent {
        feed: FeedView::new("/follow/", &page),
    };
    let chrome = LayoutChrome::for_viewer(Some(&viewer), "Following");
    let view = LayoutContext::new(chrome, content);
    Ok(render_template_response(FollowTemplate { view }, StatusCode::OK))
}

async fn follow_author(
    State(state): State<HttpState>,
    SignedIn(viewer): SignedIn,
    Path(username): Path<String>,
) -> Result<Response, HttpError> {
    let outcome = state.follows.follow(viewer.id, &username).await?;
    debug!(
        target = "blogroll::http::follow",
        follower = viewer.id,
        author = %username,
        outcome = ?outcome,
        "follow handled"
    );
    Ok(found(&profile_href(&username)))
}

async fn unfollow_author(
    State(state): State<HttpState>,
    SignedIn(viewer): SignedIn,
    Path(username): Path<String>,
) -> Result<Response, HttpError> {
    state.follows.unfollow(viewer.id, &username).await?;
    Ok(found(&profile_href(&username)))
}
