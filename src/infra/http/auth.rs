//! Sign-up, sign-in and sign-out.

use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use super::{
    HttpState, found,
    session::{AUTHOR_SESSION_KEY, Viewer, safe_next},
};
use crate::{
    application::{
        accounts::{AccountError, LoginForm, SignupForm},
        error::HttpError,
    },
    domain::entities::AuthorRecord,
    presentation::views::{
        LayoutChrome, LayoutContext, LoggedOutTemplate, LoginContent, LoginTemplate,
        SignupContent, SignupTemplate, render_template_response,
    },
};

const SOURCE: &str = "infra::http::auth";
const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Both fields may be case-sensitive.";

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/auth/signup/", get(signup_form).post(signup_submit))
        .route("/auth/login/", get(login_form).post(login_submit))
        .route("/auth/logout/", get(logout).post(logout))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SignupRequest {
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    password1: String,
    password2: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginRequest {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextQuery {
    next: Option<String>,
}

async fn signup_form(viewer: Viewer) -> Response {
    render_signup(&viewer, SignupContent::default())
}

async fn signup_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    session: Session,
    Form(request): Form<SignupRequest>,
) -> Result<Response, HttpError> {
    let content = SignupContent {
        username: request.username.clone(),
        first_name: request.first_name.clone(),
        last_name: request.last_name.clone(),
        email: request.email.clone(),
        ..SignupContent::default()
    };
    let form = SignupForm {
        username: request.username,
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
        password1: request.password1,
        password2: request.password2,
    };

    match state.accounts.signup(form).await {
        Ok(author) => {
            sign_in(&session, &author).await?;
            Ok(found("/"))
        }
        Err(AccountError::Invalid(errors)) => Ok(render_signup(
            &viewer,
            SignupContent { errors, ..content },
        )),
        Err(err) => Err(err.into()),
    }
}

fn render_signup(viewer: &Viewer, content: SignupContent) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.author(), "Sign up");
    let view = LayoutContext::new(chrome, content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

async fn login_form(viewer: Viewer, Query(query): Query<NextQuery>) -> Response {
    render_login(
        &viewer,
        LoginContent {
            username: String::new(),
            next: query.next.unwrap_or_default(),
            error: None,
        },
    )
}

async fn login_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    session: Session,
    Form(request): Form<LoginRequest>,
) -> Result<Response, HttpError> {
    let form = LoginForm {
        username: request.username.clone(),
        password: request.password,
    };

    match state.accounts.login(form).await {
        Ok(author) => {
            sign_in(&session, &author).await?;
            Ok(found(&safe_next(request.next.as_deref())))
        }
        Err(AccountError::InvalidCredentials) => Ok(render_login(
            &viewer,
            LoginContent {
                username: request.username,
                next: request.next.unwrap_or_default(),
                error: Some(BAD_CREDENTIALS.to_string()),
            },
        )),
        Err(err) => Err(err.into()),
    }
}

fn render_login(viewer: &Viewer, content: LoginContent) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.author(), "Sign in");
    let view = LayoutContext::new(chrome, content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

async fn logout(session: Session) -> Result<Response, HttpError> {
    session.flush().await.map_err(|err| {
        HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sign out failed",
            &err,
        )
    })?;

    let view = LayoutContext::new(LayoutChrome::for_viewer(None, "Signed out"), ());
    Ok(render_template_response(
        LoggedOutTemplate { view },
        StatusCode::OK,
    ))
}

/// Bind the session to `author` under a fresh session id.
async fn sign_in(session: &Session, author: &AuthorRecord) -> Result<(), HttpError> {
    let to_http = |err: tower_sessions::session::Error| {
        HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sign in failed",
            &err,
        )
    };

    session.cycle_id().await.map_err(to_http)?;
    session
        .insert(AUTHOR_SESSION_KEY, author.id)
        .await
        .map_err(to_http)?;

    info!(
        target = "blogroll::http::auth",
        author_id = author.id,
        username = %author.username,
        "author signed in"
    );
    Ok(())
}
