//! Creating and removing follow relations between authors.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::debug;

use crate::application::repos::{AuthorsRepo, FollowsRepo, RepoError};
use crate::domain::entities::{AuthorId, AuthorRecord, FollowPair};

pub const FOLLOWS_CREATED_METRIC: &str = "blogroll_follows_created_total";
pub const FOLLOWS_REMOVED_METRIC: &str = "blogroll_follows_removed_total";

/// What a follow request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following yourself is accepted and ignored.
    SelfFollowIgnored,
}

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("no author named `{0}`")]
    UnknownAuthor(String),
    #[error("not following `{0}`")]
    NotFollowing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FollowService {
    authors: Arc<dyn AuthorsRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(authors: Arc<dyn AuthorsRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { authors, follows }
    }

    pub async fn follow(
        &self,
        follower: AuthorId,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.lookup(username).await?;
        let pair = FollowPair::new(follower, author.id);
        if pair.is_self_follow() {
            debug!(follower, "ignoring self-follow");
            return Ok(FollowOutcome::SelfFollowIgnored);
        }

        if self.follows.create_follow(pair).await? {
            counter!(FOLLOWS_CREATED_METRIC).increment(1);
            Ok(FollowOutcome::Created)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    pub async fn unfollow(&self, follower: AuthorId, username: &str) -> Result<(), FollowError> {
        let author = self.lookup(username).await?;
        let pair = FollowPair::new(follower, author.id);

        match self.follows.delete_follow(pair).await {
            Ok(()) => {
                counter!(FOLLOWS_REMOVED_METRIC).increment(1);
                Ok(())
            }
            Err(RepoError::NotFound) => Err(FollowError::NotFollowing(author.username)),
            Err(err) => Err(FollowError::Repo(err)),
        }
    }

    async fn lookup(&self, username: &str) -> Result<AuthorRecord, FollowError> {
        self.authors
            .find_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
