//! Post authoring, post detail and comments.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::application::forms::FieldErrors;
use crate::application::repos::{
    AuthorsRepo, CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostFilter,
    PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{
    AuthorId, AuthorRecord, CommentRecord, GroupId, GroupRecord, PostId, PostRecord,
};
use crate::domain::rules::require_text;
use crate::infra::uploads::{UploadStorage, UploadStorageError};

/// A file received from the post form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Raw post form input.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    /// Group id as submitted by the select box; blank means no group.
    pub group: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub author: AuthorRecord,
    pub author_post_count: u64,
    pub comments: Vec<CommentRecord>,
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post {0} does not exist")]
    NotFound(PostId),
    #[error("post {post_id} belongs to another author")]
    NotOwner { post_id: PostId },
    #[error("invalid input: {0}")]
    Invalid(FieldErrors),
    #[error("failed to store image")]
    Upload(#[source] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

struct ValidPost {
    text: String,
    group_id: Option<GroupId>,
    image: Option<ImageUpload>,
}

#[derive(Clone)]
pub struct PostService {
    authors: Arc<dyn AuthorsRepo>,
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    uploads: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        authors: Arc<dyn AuthorsRepo>,
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            authors,
            groups,
            posts,
            writer,
            comments,
            uploads,
        }
    }

    /// Groups offered by the post form.
    pub async fn groups(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn detail(&self, id: PostId) -> Result<PostDetail, PostError> {
        let post = self.find(id).await?;
        let author = self
            .authors
            .find_author(post.author_id)
            .await?
            .ok_or(PostError::NotFound(id))?;
        let author_post_count = self.posts.count_posts(PostFilter::Author(author.id)).await?;
        let comments = self.comments.list_for_post(id).await?;

        Ok(PostDetail {
            post,
            author,
            author_post_count,
            comments,
        })
    }

    pub async fn create(&self, author: AuthorId, form: PostForm) -> Result<PostRecord, PostError> {
        let valid = self.validate(form).await?;
        let image = match valid.image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id: author,
                text: valid.text,
                group_id: valid.group_id,
                image,
            })
            .await?;

        info!(
            target = "blogroll::posts",
            post_id = post.id,
            author_id = author,
            "post created"
        );
        Ok(post)
    }

    /// Load a post for editing by `editor`.
    pub async fn editable(&self, id: PostId, editor: AuthorId) -> Result<PostRecord, PostError> {
        let post = self.find(id).await?;
        if post.author_id != editor {
            return Err(PostError::NotOwner { post_id: id });
        }
        Ok(post)
    }

    /// Apply an edit. Author and creation time never change; the current image is
    /// kept unless a new one is uploaded.
    pub async fn update(
        &self,
        id: PostId,
        editor: AuthorId,
        form: PostForm,
    ) -> Result<PostRecord, PostError> {
        let current = self.editable(id, editor).await?;
        let valid = self.validate(form).await?;
        let image = match valid.image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => current.image,
        };

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id,
                text: valid.text,
                group_id: valid.group_id,
                image,
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => PostError::NotFound(id),
                other => PostError::Repo(other),
            })?;

        info!(target = "blogroll::posts", post_id = id, "post updated");
        Ok(post)
    }

    pub async fn comment(
        &self,
        post_id: PostId,
        author: AuthorId,
        text: &str,
    ) -> Result<CommentRecord, PostError> {
        self.find(post_id).await?;
        let text = require_text("text", text).map_err(|err| {
            let mut errors = FieldErrors::new();
            errors.push_domain("text", &err);
            PostError::Invalid(errors)
        })?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: author,
                text,
            })
            .await?;
        Ok(comment)
    }

    async fn find(&self, id: PostId) -> Result<PostRecord, PostError> {
        self.posts
            .find_post(id)
            .await?
            .ok_or(PostError::NotFound(id))
    }

    async fn validate(&self, form: PostForm) -> Result<ValidPost, PostError> {
        let mut errors = FieldErrors::new();

        let text = match require_text("text", &form.text) {
            Ok(text) => text,
            Err(err) => {
                errors.push_domain("text", &err);
                String::new()
            }
        };

        let group_id = match form.group.trim() {
            "" => None,
            raw => match raw.parse::<GroupId>() {
                Ok(id) if self.groups.find_group(id).await?.is_some() => Some(id),
                _ => {
                    errors.push("group", "Select a valid choice.");
                    None
                }
            },
        };

        if let Some(upload) = &form.image
            && let Err(err) = UploadStorage::inspect_image(&upload.bytes)
        {
            errors.push("image", err.to_string());
        }

        errors.into_result().map_err(PostError::Invalid)?;

        Ok(ValidPost {
            text,
            group_id,
            image: form.image,
        })
    }

    async fn store_image(&self, upload: ImageUpload) -> Result<String, PostError> {
        let stored = self
            .uploads
            .store_image(&upload.file_name, upload.bytes)
            .await
            .map_err(PostError::Upload)?;
        Ok(stored.stored_path)
    }
}
