use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{
    CreatePostParams, ListWindow, PostFilter, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams,
};
use crate::domain::entities::{PostGroup, PostId, PostRecord};

use super::{PostgresRepositories, map_sqlx_error};

const POST_SELECT: &str = "SELECT p.id, p.text, p.created_at, p.author_id, \
     a.username AS author_username, p.group_id, g.slug AS group_slug, \
     g.title AS group_title, p.image \
     FROM posts p \
     INNER JOIN authors a ON a.id = p.author_id \
     LEFT JOIN post_groups g ON g.id = p.group_id \
     WHERE 1=1 ";

/// Newest first; `id` keeps rows sharing a timestamp in insertion order.
const POST_ORDER: &str = " ORDER BY p.created_at DESC, p.id ASC";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    created_at: OffsetDateTime,
    author_id: i64,
    author_username: String,
    group_id: Option<i64>,
    group_slug: Option<String>,
    group_title: Option<String>,
    image: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(PostGroup { id, slug, title }),
            _ => None,
        };

        Self {
            id: row.id,
            text: row.text,
            created_at: row.created_at,
            author_id: row.author_id,
            author_username: row.author_username,
            group,
            image: row.image,
        }
    }
}

impl PostgresRepositories {
    async fn fetch_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn require_post(&self, id: PostId) -> Result<PostRecord, RepoError> {
        self.fetch_post(id).await?.ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_post_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        window: Option<ListWindow>,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        Self::apply_post_filter(&mut qb, filter);
        qb.push(POST_ORDER);

        if let Some(window) = window {
            let offset = i64::try_from(window.offset).map_err(|_| RepoError::InvalidInput {
                message: "offset exceeds supported range".to_string(),
            })?;
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(window.limit));
            qb.push(" OFFSET ");
            qb.push_bind(offset);
        }

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        self.fetch_post(id).await
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (author_id, text, group_id, image) VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(params.author_id)
        .bind(params.text)
        .bind(params.group_id)
        .bind(params.image)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.require_post(id).await
    }

    async fn create_posts(
        &self,
        params: Vec<CreatePostParams>,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let mut ids = Vec::with_capacity(params.len());

        for item in params {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO posts (author_id, text, group_id, image) VALUES ($1, $2, $3, $4) \
                 RETURNING id",
            )
            .bind(item.author_id)
            .bind(item.text)
            .bind(item.group_id)
            .bind(item.image)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            ids.push(id);
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            records.push(self.require_post(id).await?);
        }
        Ok(records)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE posts SET text = $1, group_id = $2, image = $3 WHERE id = $4 RETURNING id",
        )
        .bind(params.text)
        .bind(params.group_id)
        .bind(params.image)
        .bind(params.id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let id = updated.ok_or(RepoError::NotFound)?;
        self.require_post(id).await
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
