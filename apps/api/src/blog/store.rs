use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::blog::{BlogPostDraft, BlogPostRow, BlogPostSummary};

/// Carried in `AppState` as `Arc<dyn BlogStore>`. Drafts passed in are
/// already normalized, so `draft.slug()` is set.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn list(&self) -> Result<Vec<BlogPostSummary>, AppError>;

    async fn get(&self, slug: &str) -> Result<Option<BlogPostRow>, AppError>;

    /// `Conflict` if the slug is taken.
    async fn create(&self, draft: &BlogPostDraft) -> Result<BlogPostRow, AppError>;

    /// Replaces the post at `slug`; the draft may carry a new slug.
    async fn update(
        &self,
        slug: &str,
        draft: &BlogPostDraft,
    ) -> Result<Option<BlogPostRow>, AppError>;

    async fn delete(&self, slug: &str) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgBlogStore {
    pool: PgPool,
}

impl PgBlogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn slug_conflict(e: sqlx::Error, slug: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("A post with slug '{slug}' already exists"))
        }
        _ => AppError::Database(e),
    }
}

#[async_trait]
impl BlogStore for PgBlogStore {
    async fn list(&self) -> Result<Vec<BlogPostSummary>, AppError> {
        Ok(sqlx::query_as::<_, BlogPostSummary>(
            r#"
            SELECT slug, title, author, date, excerpt, image_url
            FROM blog_posts
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get(&self, slug: &str) -> Result<Option<BlogPostRow>, AppError> {
        Ok(
            sqlx::query_as::<_, BlogPostRow>("SELECT * FROM blog_posts WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create(&self, draft: &BlogPostDraft) -> Result<BlogPostRow, AppError> {
        let date = draft.date.unwrap_or_else(|| Utc::now().date_naive());
        sqlx::query_as::<_, BlogPostRow>(
            r#"
            INSERT INTO blog_posts (id, slug, title, author, date, excerpt, content, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(draft.slug())
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(date)
        .bind(&draft.excerpt)
        .bind(&draft.content)
        .bind(draft.image_url.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| slug_conflict(e, draft.slug()))
    }

    async fn update(
        &self,
        slug: &str,
        draft: &BlogPostDraft,
    ) -> Result<Option<BlogPostRow>, AppError> {
        sqlx::query_as::<_, BlogPostRow>(
            r#"
            UPDATE blog_posts
            SET slug = $2,
                title = $3,
                author = $4,
                date = COALESCE($5, date),
                excerpt = $6,
                content = $7,
                image_url = $8,
                updated_at = now()
            WHERE slug = $1
            RETURNING *
            "#,
        )
        .bind(slug)
        .bind(draft.slug())
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(draft.date)
        .bind(&draft.excerpt)
        .bind(&draft.content)
        .bind(draft.image_url.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| slug_conflict(e, draft.slug()))
    }

    async fn delete(&self, slug: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
