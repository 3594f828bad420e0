//! In-process repository backend.
//!
//! Used when no database is configured and by the test-suite. It enforces the
//! same uniqueness and referential rules as the Postgres schema.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use crate::application::repos::{
    AuthorsRepo, CommentsRepo, CreateAuthorParams, CreateCommentParams, CreateGroupParams,
    CreatePostParams, FollowsRepo, GroupsRepo, ListWindow, PostFilter, PostsRepo, PostsWriteRepo,
    RepoError, StoreHealth, UpdatePostParams,
};
use crate::domain::entities::{
    AuthorCredentials, AuthorId, AuthorRecord, CommentId, CommentRecord, FollowPair, GroupId,
    GroupRecord, PostGroup, PostId, PostRecord,
};

#[derive(Debug, Clone)]
struct StoredPost {
    id: PostId,
    text: String,
    created_at: OffsetDateTime,
    author_id: AuthorId,
    group_id: Option<GroupId>,
    image: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: CommentId,
    post_id: PostId,
    author_id: AuthorId,
    text: String,
    created_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct MemoryState {
    authors: BTreeMap<AuthorId, AuthorCredentials>,
    groups: BTreeMap<GroupId, GroupRecord>,
    posts: BTreeMap<PostId, StoredPost>,
    comments: BTreeMap<CommentId, StoredComment>,
    follows: BTreeSet<FollowPair>,
    last_id: i64,
    last_timestamp: Option<OffsetDateTime>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// Wall-clock time, nudged forward so consecutive inserts never share a timestamp.
    fn next_timestamp(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next
    }

    fn author(&self, id: AuthorId) -> Result<&AuthorCredentials, RepoError> {
        self.authors.get(&id).ok_or_else(|| RepoError::InvalidInput {
            message: format!("author {id} does not exist"),
        })
    }

    fn check_group(&self, group_id: Option<GroupId>) -> Result<(), RepoError> {
        match group_id {
            Some(id) if !self.groups.contains_key(&id) => Err(RepoError::InvalidInput {
                message: format!("group {id} does not exist"),
            }),
            _ => Ok(()),
        }
    }

    fn matches(&self, post: &StoredPost, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(viewer) => self
                .follows
                .contains(&FollowPair::new(viewer, post.author_id)),
        }
    }

    fn to_record(&self, post: &StoredPost) -> PostRecord {
        let author_username = self
            .authors
            .get(&post.author_id)
            .map(|credentials| credentials.author.username.clone())
            .unwrap_or_default();
        let group = post
            .group_id
            .and_then(|id| self.groups.get(&id))
            .map(|group| PostGroup {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            });

        PostRecord {
            id: post.id,
            text: post.text.clone(),
            created_at: post.created_at,
            author_id: post.author_id,
            author_username,
            group,
            image: post.image.clone(),
        }
    }

    fn insert_post(&mut self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        self.author(params.author_id)?;
        self.check_group(params.group_id)?;

        let post = StoredPost {
            id: self.next_id(),
            text: params.text,
            created_at: self.next_timestamp(),
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        let record = self.to_record(&post);
        self.posts.insert(post.id, post);
        Ok(record)
    }
}

/// Newest first; equal timestamps fall back to insertion order.
fn feed_order(a: &StoredPost, b: &StoredPost) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id))
}

#[derive(Debug, Default)]
pub struct MemoryRepositories {
    state: RwLock<MemoryState>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorsRepo for MemoryRepositories {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let mut state = self.state.write().await;
        if state
            .authors
            .values()
            .any(|existing| existing.author.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "authors_username_key".to_string(),
            });
        }

        let author = AuthorRecord {
            id: state.next_id(),
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            created_at: state.next_timestamp(),
        };
        state.authors.insert(
            author.id,
            AuthorCredentials {
                author: author.clone(),
                password_hash: params.password_hash,
            },
        );
        Ok(author)
    }

    async fn find_author(&self, id: AuthorId) -> Result<Option<AuthorRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.authors.get(&id).map(|entry| entry.author.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AuthorRecord>, RepoError> {
        Ok(self
            .find_credentials(username)
            .await?
            .map(|credentials| credentials.author))
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<AuthorCredentials>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .authors
            .values()
            .find(|entry| entry.author.username == username)
            .cloned())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepositories {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.groups.values().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }

        let group = GroupRecord {
            id: state.next_id(),
            slug: params.slug,
            title: params.title,
            description: params.description,
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_group(&self, id: GroupId) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|group| group.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        let mut groups: Vec<GroupRecord> = state.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        let count = state
            .posts
            .values()
            .filter(|post| state.matches(post, filter))
            .count();
        Ok(count as u64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        window: Option<ListWindow>,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.state.read().await;
        let mut posts: Vec<&StoredPost> = state
            .posts
            .values()
            .filter(|post| state.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| feed_order(a, b));

        let (offset, limit) = match window {
            Some(window) => (window.offset as usize, window.limit as usize),
            None => (0, usize::MAX),
        };
        Ok(posts
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|post| state.to_record(post))
            .collect())
    }

    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.posts.get(&id).map(|post| state.to_record(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        self.state.write().await.insert_post(params)
    }

    async fn create_posts(
        &self,
        params: Vec<CreatePostParams>,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut state = self.state.write().await;
        for item in &params {
            state.author(item.author_id)?;
            state.check_group(item.group_id)?;
        }
        params
            .into_iter()
            .map(|item| state.insert_post(item))
            .collect()
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.write().await;
        state.check_group(params.group_id)?;

        let post = state.posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        let post = post.clone();
        Ok(state.to_record(&post))
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state.posts.remove(&id).ok_or(RepoError::NotFound)?;
        state.comments.retain(|_, comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.write().await;
        let author_username = state.author(params.author_id)?.author.username.clone();
        if !state.posts.contains_key(&params.post_id) {
            return Err(RepoError::InvalidInput {
                message: format!("post {} does not exist", params.post_id),
            });
        }

        let comment = StoredComment {
            id: state.next_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: state.next_timestamp(),
        };
        state.comments.insert(comment.id, comment.clone());

        Ok(CommentRecord {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            author_username,
            text: comment.text,
            created_at: comment.created_at,
        })
    }

    async fn list_for_post(&self, post_id: PostId) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| CommentRecord {
                id: comment.id,
                post_id: comment.post_id,
                author_id: comment.author_id,
                author_username: state
                    .authors
                    .get(&comment.author_id)
                    .map(|entry| entry.author.username.clone())
                    .unwrap_or_default(),
                text: comment.text.clone(),
                created_at: comment.created_at,
            })
            .collect())
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepositories {
    async fn create_follow(&self, pair: FollowPair) -> Result<bool, RepoError> {
        if pair.is_self_follow() {
            return Err(RepoError::Integrity {
                message: "an author cannot follow themselves".to_string(),
            });
        }
        let mut state = self.state.write().await;
        state.author(pair.follower_id)?;
        state.author(pair.author_id)?;
        Ok(state.follows.insert(pair))
    }

    async fn delete_follow(&self, pair: FollowPair) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.follows.remove(&pair) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }

    async fn is_following(&self, pair: FollowPair) -> Result<bool, RepoError> {
        Ok(self.state.read().await.follows.contains(&pair))
    }

    async fn count_followers(&self, author_id: AuthorId) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .iter()
            .filter(|pair| pair.author_id == author_id)
            .count() as u64)
    }

    async fn count_following(&self, follower_id: AuthorId) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .iter()
            .filter(|pair| pair.follower_id == follower_id)
            .count() as u64)
    }
}

#[async_trait]
impl StoreHealth for MemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}
