//! Viewer resolution from the session cookie.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, Uri, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::debug;

use super::{HttpState, found};
use crate::application::error::{HttpError, repo_error_to_http};
use crate::domain::entities::{AuthorId, AuthorRecord};

pub const AUTHOR_SESSION_KEY: &str = "author_id";

const LOGIN_PATH: &str = "/auth/login/";
const SOURCE: &str = "infra::http::session";

/// The signed-in author, if any.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<AuthorRecord>);

impl Viewer {
    pub fn id(&self) -> Option<AuthorId> {
        self.0.as_ref().map(|author| author.id)
    }

    pub fn author(&self) -> Option<&AuthorRecord> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    HttpState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(status, message)| {
                HttpError::new(SOURCE, status, "Session unavailable", message).into_response()
            })?;

        let author_id = session
            .get::<AuthorId>(AUTHOR_SESSION_KEY)
            .await
            .map_err(|err| {
                HttpError::from_error(
                    SOURCE,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Session unavailable",
                    &err,
                )
                .into_response()
            })?;

        let Some(author_id) = author_id else {
            return Ok(Viewer(None));
        };

        let state = HttpState::from_ref(state);
        let author = state
            .authors
            .find_author(author_id)
            .await
            .map_err(|err| repo_error_to_http(SOURCE, err).into_response())?;

        if author.is_none() {
            debug!(
                target = "blogroll::http::session",
                author_id, "session refers to a missing author"
            );
        }
        Ok(Viewer(author))
    }
}

/// A route guard: the request must come from a signed-in author.
///
/// Anonymous requests are redirected to the login page with the requested
/// path in `next`.
#[derive(Debug, Clone)]
pub struct SignedIn(pub AuthorRecord);

impl<S> FromRequestParts<S> for SignedIn
where
    HttpState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Viewer(author) = Viewer::from_request_parts(parts, state).await?;
        match author {
            Some(author) => Ok(SignedIn(author)),
            None => Err(login_redirect(&parts.uri)),
        }
    }
}

/// Redirect to the login form, remembering where the visitor wanted to go.
pub fn login_redirect(uri: &Uri) -> Response {
    let target = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or_else(|| uri.path());
    found(&format!("{LOGIN_PATH}?next={}", encode_next(target)))
}

/// Only local absolute paths are followed after sign-in.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

fn encode_next(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                encoded.push(char::from(byte))
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}
