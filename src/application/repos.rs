//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    AuthorCredentials, AuthorId, AuthorRecord, CommentRecord, FollowPair, GroupId, GroupRecord,
    PostId, PostRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(GroupId),
    Author(AuthorId),
    /// Posts written by any author the given viewer follows.
    FollowedBy(AuthorId),
}

/// Offset/limit slice requested from a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListWindow {
    pub offset: u64,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct CreateAuthorParams {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError>;
    async fn find_author(&self, id: AuthorId) -> Result<Option<AuthorRecord>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<AuthorRecord>, RepoError>;
    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<AuthorCredentials>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub slug: String,
    pub title: String,
    pub description: String,
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;
    async fn find_group(&self, id: GroupId) -> Result<Option<GroupRecord>, RepoError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

/// Listings are ordered newest first; posts sharing a timestamp keep insertion order.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError>;
    async fn list_posts(
        &self,
        filter: PostFilter,
        window: Option<ListWindow>,
    ) -> Result<Vec<PostRecord>, RepoError>;
    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: AuthorId,
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
}

/// Editable post fields; the author and creation time are fixed at creation.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: PostId,
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Insert several posts at once, in order; all or nothing.
    async fn create_posts(
        &self,
        params: Vec<CreatePostParams>,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Delete a post together with its comments.
    async fn delete_post(&self, id: PostId) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: PostId,
    pub author_id: AuthorId,
    pub text: String,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    /// Comments of a post, oldest first.
    async fn list_for_post(&self, post_id: PostId) -> Result<Vec<CommentRecord>, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Insert the pair unless it already exists; returns whether a row was created.
    async fn create_follow(&self, pair: FollowPair) -> Result<bool, RepoError>;

    /// Remove the pair; `RepoError::NotFound` when it does not exist.
    async fn delete_follow(&self, pair: FollowPair) -> Result<(), RepoError>;

    async fn is_following(&self, pair: FollowPair) -> Result<bool, RepoError>;
    async fn count_followers(&self, author_id: AuthorId) -> Result<u64, RepoError>;
    async fn count_following(&self, follower_id: AuthorId) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

/// Every repository a running site needs, implemented by one backend.
pub trait Repositories:
    AuthorsRepo
    + GroupsRepo
    + PostsRepo
    + PostsWriteRepo
    + CommentsRepo
    + FollowsRepo
    + StoreHealth
    + 'static
{
}

impl<T> Repositories for T where
    T: AuthorsRepo
        + GroupsRepo
        + PostsRepo
        + PostsWriteRepo
        + CommentsRepo
        + FollowsRepo
        + StoreHealth
        + 'static
{
}
