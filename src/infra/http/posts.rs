//! Post authoring and comment routes.

use axum::{
    Form, Router,
    extract::{
        Multipart, Path, State,
        multipart::MultipartError,
    },
    http::StatusCode,
    response::Response,
    routing::get,
};
use serde::Deserialize;
use tracing::warn;

use super::{HttpState, found, public::parse_post_id, session::SignedIn};
use crate::{
    application::{
        error::HttpError,
        forms::FieldErrors,
        posts::{ImageUpload, PostError, PostForm},
    },
    domain::entities::{AuthorRecord, GroupRecord, PostRecord},
    presentation::views::{
        LayoutChrome, LayoutContext, PostDetailContent, PostDetailTemplate, PostFormContent,
        PostFormTemplate, post_href, profile_href, render_template_response,
    },
};

const SOURCE: &str = "infra::http::posts";

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/create/", get(create_form).post(create_submit))
        .route("/posts/{id}/edit/", get(edit_form).post(edit_submit))
        .route("/posts/{id}/comment/", get(comment_redirect).post(add_comment))
}

async fn create_form(
    State(state): State<HttpState>,
    SignedIn(author): SignedIn,
) -> Result<Response, HttpError> {
    let groups = state.posts.groups().await?;
    Ok(render_form(&author, PostFormContent::create(&groups)))
}

async fn create_submit(
    State(state): State<HttpState>,
    SignedIn(author): SignedIn,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    let form = read_post_form(&mut multipart).await?;
    let (text, group) = (form.text.clone(), form.group.clone());

    match state.posts.create(author.id, form).await {
        Ok(_) => Ok(found(&profile_href(&author.username))),
        Err(PostError::Invalid(errors)) => {
            let groups = state.posts.groups().await?;
            let content =
                PostFormContent::create(&groups).with_submission(text, &group, &groups, errors);
            Ok(render_form(&author, content))
        }
        Err(err) => Err(err.into()),
    }
}

async fn edit_form(
    State(state): State<HttpState>,
    SignedIn(author): SignedIn,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let id = parse_post_id(&id)?;
    let post = match state.posts.editable(id, author.id).await {
        Ok(post) => post,
        Err(PostError::NotOwner { post_id }) => return Ok(found(&post_href(post_id))),
        Err(err) => return Err(err.into()),
    };
    let groups = state.posts.groups().await?;
    Ok(render_form(&author, PostFormContent::edit(&post, &groups)))
}

async fn edit_submit(
    State(state): State<HttpState>,
    SignedIn(author): SignedIn,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    let id = parse_post_id(&id)?;
    let form = read_post_form(&mut multipart).await?;
    let (text, group) = (form.text.clone(), form.group.clone());

    match state.posts.update(id, author.id, form).await {
        Ok(post) => Ok(found(&post_href(post.id))),
        Err(PostError::NotOwner { post_id }) => Ok(found(&post_href(post_id))),
        Err(PostError::Invalid(errors)) => {
            let post = state.posts.editable(id, author.id).await?;
            let groups = state.posts.groups().await?;
            Ok(render_form(
                &author,
                edit_content(&post, &groups, text, &group, errors),
            ))
        }
        Err(err) => Err(err.into()),
    }
}

fn edit_content(
    post: &PostRecord,
    groups: &[GroupRecord],
    text: String,
    group: &str,
    errors: FieldErrors,
) -> PostFormContent {
    PostFormContent::edit(post, groups).with_submission(text, group, groups, errors)
}

fn render_form(author: &AuthorRecord, content: PostFormContent) -> Response {
    let title = if content.is_edit {
        "Edit post"
    } else {
        "New post"
    };
    let view = LayoutContext::new(LayoutChrome::for_viewer(Some(author), title), content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

/// Read the `text`, `group` and `image` parts of the post form.
async fn read_post_form(multipart: &mut Multipart) -> Result<PostForm, HttpError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("text") => form.text = field.text().await.map_err(multipart_error)?,
            Some("group") => form.group = field.text().await.map_err(multipart_error)?,
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().trim().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty, unnamed part when no file was chosen.
                if !(file_name.is_empty() && bytes.is_empty()) {
                    form.image = Some(ImageUpload { file_name, bytes });
                }
            }
            _ => continue,
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError) -> HttpError {
    let status = err.status();
    warn!(
        target = SOURCE,
        status = status.as_u16(),
        error = %err,
        "failed to read multipart payload"
    );
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => HttpError::from_error(
            SOURCE,
            StatusCode::PAYLOAD_TOO_LARGE,
            "Upload too large",
            &err,
        ),
        _ => HttpError::from_error(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Request could not be processed",
            &err,
        ),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentRequest {
    text: String,
}

async fn comment_redirect(
    SignedIn(_author): SignedIn,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let id = parse_post_id(&id)?;
    Ok(found(&post_href(id)))
}

async fn add_comment(
    State(state): State<HttpState>,
    SignedIn(author): SignedIn,
    Path(id): Path<String>,
    Form(request): Form<CommentRequest>,
) -> Result<Response, HttpError> {
    let id = parse_post_id(&id)?;

    match state.posts.comment(id, author.id, &request.text).await {
        Ok(_) => Ok(found(&post_href(id))),
        Err(PostError::Invalid(errors)) => {
            let detail = state.posts.detail(id).await?;
            let content = PostDetailContent::new(&detail, Some(&author))
                .with_comment_error(request.text, errors.get("text").map(str::to_string));
            let title = format!("Post {}", detail.post.excerpt());
            let view =
                LayoutContext::new(LayoutChrome::for_viewer(Some(&author), title), content);
            Ok(render_template_response(
                PostDetailTemplate { view },
                StatusCode::OK,
            ))
        }
        Err(err) => Err(err.into()),
    }
}
