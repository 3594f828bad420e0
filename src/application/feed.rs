use std::num::NonZeroU32;
use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{Page, PageWindow};
use crate::application::repos::{
    AuthorsRepo, FollowsRepo, GroupsRepo, ListWindow, PostFilter, PostsRepo, RepoError,
};
use crate::domain::entities::{AuthorId, AuthorRecord, FollowPair, GroupRecord, PostRecord};

/// Which posts a feed shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    Global,
    Group(String),
    Author(String),
    /// Posts by the authors the viewer follows.
    Followed,
}

/// Author header shown above a profile feed.
#[derive(Debug, Clone)]
pub struct AuthorProfile {
    pub author: AuthorRecord,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    /// Whether the current viewer follows this author.
    pub following: bool,
    /// Whether the current viewer is this author.
    pub is_self: bool,
}

/// What a feed page is about.
#[derive(Debug, Clone)]
pub enum FeedSubject {
    Global,
    Group(GroupRecord),
    Author(Box<AuthorProfile>),
    Followed,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub subject: FeedSubject,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no group with slug `{0}`")]
    UnknownGroup(String),
    #[error("no author named `{0}`")]
    UnknownAuthor(String),
    #[error("the followed feed requires a signed-in viewer")]
    Unauthorized,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    authors: Arc<dyn AuthorsRepo>,
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    follows: Arc<dyn FollowsRepo>,
    page_size: NonZeroU32,
}

struct ResolvedScope {
    subject: FeedSubject,
    filter: PostFilter,
}

impl FeedService {
    pub fn new(
        authors: Arc<dyn AuthorsRepo>,
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        follows: Arc<dyn FollowsRepo>,
        page_size: NonZeroU32,
    ) -> Self {
        Self {
            authors,
            groups,
            posts,
            follows,
            page_size,
        }
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    /// Every post in the scope, newest first.
    pub async fn select_feed(
        &self,
        scope: &FeedScope,
        viewer: Option<AuthorId>,
    ) -> Result<Vec<PostRecord>, FeedError> {
        let resolved = self.resolve(scope, viewer).await?;
        let posts = self.posts.list_posts(resolved.filter, None).await?;
        Ok(posts)
    }

    /// One page of the scope. The page number is clamped, never rejected.
    pub async fn feed_page(
        &self,
        scope: &FeedScope,
        viewer: Option<AuthorId>,
        requested_page: Option<&str>,
    ) -> Result<FeedPage, FeedError> {
        let resolved = self.resolve(scope, viewer).await?;

        let total = self.posts.count_posts(resolved.filter).await?;
        let window = PageWindow::resolve(total, self.page_size, requested_page);
        let items = if window.is_empty() {
            Vec::new()
        } else {
            self.posts
                .list_posts(
                    resolved.filter,
                    Some(ListWindow {
                        offset: window.offset(),
                        limit: window.page_size(),
                    }),
                )
                .await?
        };

        let subject = match resolved.subject {
            FeedSubject::Author(mut profile) => {
                profile.post_count = total;
                FeedSubject::Author(profile)
            }
            other => other,
        };

        Ok(FeedPage {
            subject,
            page: Page { items, window },
        })
    }

    async fn resolve(
        &self,
        scope: &FeedScope,
        viewer: Option<AuthorId>,
    ) -> Result<ResolvedScope, FeedError> {
        match scope {
            FeedScope::Global => Ok(ResolvedScope {
                subject: FeedSubject::Global,
                filter: PostFilter::All,
            }),
            FeedScope::Group(slug) => {
                let group = self
                    .groups
                    .find_by_slug(slug)
                    .await?
                    .ok_or_else(|| FeedError::UnknownGroup(slug.clone()))?;
                let filter = PostFilter::Group(group.id);
                Ok(ResolvedScope {
                    subject: FeedSubject::Group(group),
                    filter,
                })
            }
            FeedScope::Author(username) => {
                let author = self
                    .authors
                    .find_by_username(username)
                    .await?
                    .ok_or_else(|| FeedError::UnknownAuthor(username.clone()))?;
                let profile = self.profile(author, viewer).await?;
                let filter = PostFilter::Author(profile.author.id);
                Ok(ResolvedScope {
                    subject: FeedSubject::Author(Box::new(profile)),
                    filter,
                })
            }
            FeedScope::Followed => {
                let viewer = viewer.ok_or(FeedError::Unauthorized)?;
                Ok(ResolvedScope {
                    subject: FeedSubject::Followed,
                    filter: PostFilter::FollowedBy(viewer),
                })
            }
        }
    }

    async fn profile(
        &self,
        author: AuthorRecord,
        viewer: Option<AuthorId>,
    ) -> Result<AuthorProfile, FeedError> {
        let is_self = viewer == Some(author.id);
        let following = match viewer {
            Some(viewer) if !is_self => {
                self.follows
                    .is_following(FollowPair::new(viewer, author.id))
                    .await?
            }
            _ => false,
        };
        let follower_count = self.follows.count_followers(author.id).await?;
        let following_count = self.follows.count_following(author.id).await?;

        Ok(AuthorProfile {
            author,
            post_count: 0,
            follower_count,
            following_count,
            following,
            is_self,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::{
        CreateAuthorParams, CreateGroupParams, CreatePostParams, PostsWriteRepo,
    };
    use crate::domain::entities::GroupId;
    use crate::infra::memory::MemoryRepositories;

    fn service(repos: &Arc<MemoryRepositories>, page_size: u32) -> FeedService {
        FeedService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            NonZeroU32::new(page_size).unwrap(),
        )
    }

    async fn author(repos: &MemoryRepositories, username: &str) -> AuthorRecord {
        repos
            .create_author(CreateAuthorParams {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash: String::new(),
            })
            .await
            .unwrap()
    }

    async fn write(repos: &MemoryRepositories, author: &AuthorRecord, group: Option<GroupId>) {
        repos
            .create_post(CreatePostParams {
                author_id: author.id,
                text: format!("written by {}", author.username),
                group_id: group,
                image: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn author_scope_only_returns_that_author() {
        let repos = Arc::new(MemoryRepositories::new());
        let leo = author(&repos, "leo").await;
        let anna = author(&repos, "anna").await;
        for _ in 0..3 {
            write(&repos, &leo, None).await;
            write(&repos, &anna, None).await;
        }

        let feed = service(&repos, 10)
            .select_feed(&FeedScope::Author("leo".to_string()), None)
            .await
            .unwrap();

        assert_eq!(feed.len(), 3);
        assert!(feed.iter().all(|post| post.author_id == leo.id));
        assert!(
            feed.windows(2)
                .all(|pair| pair[0].created_at >= pair[1].created_at)
        );
    }

    #[tokio::test]
    async fn unknown_group_and_author_are_reported() {
        let repos = Arc::new(MemoryRepositories::new());
        let feed = service(&repos, 10);

        let err = feed
            .feed_page(&FeedScope::Group("missing".to_string()), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::UnknownGroup(slug) if slug == "missing"));

        let err = feed
            .feed_page(&FeedScope::Author("ghost".to_string()), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::UnknownAuthor(_)));
    }

    #[tokio::test]
    async fn followed_scope_requires_a_viewer() {
        let repos = Arc::new(MemoryRepositories::new());
        let err = service(&repos, 10)
            .select_feed(&FeedScope::Followed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Unauthorized));
    }

    #[tokio::test]
    async fn group_pages_split_at_page_size() {
        let repos = Arc::new(MemoryRepositories::new());
        let leo = author(&repos, "leo").await;
        let group = repos
            .create_group(CreateGroupParams {
                slug: "test-slug".to_string(),
                title: "Test group".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        for _ in 0..13 {
            write(&repos, &leo, Some(group.id)).await;
        }
        let feed = service(&repos, 10);
        let scope = FeedScope::Group("test-slug".to_string());

        let first = feed.feed_page(&scope, None, None).await.unwrap();
        let second = feed.feed_page(&scope, None, Some("2")).await.unwrap();
        let beyond = feed.feed_page(&scope, None, Some("9")).await.unwrap();

        assert_eq!(first.page.items.len(), 10);
        assert_eq!(second.page.items.len(), 3);
        assert_eq!(beyond.page.items, second.page.items);
        assert!(matches!(first.subject, FeedSubject::Group(ref g) if g.id == group.id));
    }

    #[tokio::test]
    async fn profile_reports_follow_state_for_viewer() {
        let repos = Arc::new(MemoryRepositories::new());
        let leo = author(&repos, "leo").await;
        let anna = author(&repos, "anna").await;
        write(&repos, &leo, None).await;
        repos
            .create_follow(FollowPair::new(anna.id, leo.id))
            .await
            .unwrap();
        let feed = service(&repos, 10);
        let scope = FeedScope::Author("leo".to_string());

        let as_anna = feed.feed_page(&scope, Some(anna.id), None).await.unwrap();
        let FeedSubject::Author(profile) = as_anna.subject else {
            panic!("expected profile subject");
        };
        assert!(profile.following);
        assert!(!profile.is_self);
        assert_eq!(profile.post_count, 1);
        assert_eq!(profile.follower_count, 1);

        let as_leo = feed.feed_page(&scope, Some(leo.id), None).await.unwrap();
        let FeedSubject::Author(profile) = as_leo.subject else {
            panic!("expected profile subject");
        };
        assert!(!profile.following);
        assert!(profile.is_self);
    }
}
