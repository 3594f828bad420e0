//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

/// Number of characters used when a post or comment is summarised in a title.
pub const TEXT_EXCERPT_CHARS: usize = 15;

pub type AuthorId = i64;
pub type GroupId = i64;
pub type PostId = i64;
pub type CommentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRecord {
    pub id: AuthorId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: OffsetDateTime,
}

impl AuthorRecord {
    /// Full name when one was given at registration, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Author plus the stored password hash; never leaves the accounts service.
#[derive(Debug, Clone)]
pub struct AuthorCredentials {
    pub author: AuthorRecord,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub slug: String,
    pub title: String,
    pub description: String,
}

/// Group fields carried along with a post listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostGroup {
    pub id: GroupId,
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: PostId,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub author_id: AuthorId,
    pub author_username: String,
    pub group: Option<PostGroup>,
    pub image: Option<String>,
}

impl PostRecord {
    pub fn excerpt(&self) -> String {
        excerpt(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: AuthorId,
    pub author_username: String,
    pub text: String,
    pub created_at: OffsetDateTime,
}

impl CommentRecord {
    pub fn excerpt(&self) -> String {
        excerpt(&self.text)
    }
}

/// Directed "follower reads author" relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FollowPair {
    pub follower_id: AuthorId,
    pub author_id: AuthorId,
}

impl FollowPair {
    pub fn new(follower_id: AuthorId, author_id: AuthorId) -> Self {
        Self {
            follower_id,
            author_id,
        }
    }

    pub fn is_self_follow(&self) -> bool {
        self.follower_id == self.author_id
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(TEXT_EXCERPT_CHARS).collect()
}
