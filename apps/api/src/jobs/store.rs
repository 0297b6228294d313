use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{JobDraft, JobRow, JobStatus, StatusCount};

/// Every query is scoped by owner: another user's job id behaves as missing.
/// Carried in `AppState` as `Arc<dyn JobStore>`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn list(&self, user_id: Uuid, status: Option<JobStatus>) -> Result<Vec<JobRow>, AppError>;

    async fn get(&self, user_id: Uuid, job_id: Uuid) -> Result<Option<JobRow>, AppError>;

    async fn create(&self, user_id: Uuid, draft: &JobDraft) -> Result<JobRow, AppError>;

    async fn update(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        draft: &JobDraft,
    ) -> Result<Option<JobRow>, AppError>;

    async fn update_status(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        status: JobStatus,
    ) -> Result<Option<JobRow>, AppError>;

    async fn delete(&self, user_id: Uuid, job_id: Uuid) -> Result<bool, AppError>;

    async fn status_counts(&self, user_id: Uuid) -> Result<Vec<StatusCount>, AppError>;
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn list(&self, user_id: Uuid, status: Option<JobStatus>) -> Result<Vec<JobRow>, AppError> {
        Ok(sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM jobs
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY application_date DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(status.map(JobStatus::as_str))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get(&self, user_id: Uuid, job_id: Uuid) -> Result<Option<JobRow>, AppError> {
        Ok(
            sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 AND user_id = $2")
                .bind(job_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create(&self, user_id: Uuid, draft: &JobDraft) -> Result<JobRow, AppError> {
        let application_date = draft
            .application_date
            .unwrap_or_else(|| Utc::now().date_naive());
        Ok(sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs
                (id, user_id, company, title, location, application_date, status, notes, job_description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&draft.company)
        .bind(&draft.title)
        .bind(&draft.location)
        .bind(application_date)
        .bind(draft.status.as_str())
        .bind(&draft.notes)
        .bind(draft.job_description.as_deref())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        draft: &JobDraft,
    ) -> Result<Option<JobRow>, AppError> {
        Ok(sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET company = $3,
                title = $4,
                location = $5,
                application_date = COALESCE($6, application_date),
                status = $7,
                notes = $8,
                job_description = $9,
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(user_id)
        .bind(&draft.company)
        .bind(&draft.title)
        .bind(&draft.location)
        .bind(draft.application_date)
        .bind(draft.status.as_str())
        .bind(&draft.notes)
        .bind(draft.job_description.as_deref())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_status(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        status: JobStatus,
    ) -> Result<Option<JobRow>, AppError> {
        Ok(sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs SET status = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(user_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete(&self, user_id: Uuid, job_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND user_id = $2")
            .bind(job_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn status_counts(&self, user_id: Uuid) -> Result<Vec<StatusCount>, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM jobs WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fill_status_counts(rows))
    }
}

/// One entry per pipeline stage in display order, zero for stages with no jobs.
pub fn fill_status_counts(rows: Vec<(String, i64)>) -> Vec<StatusCount> {
    JobStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: rows
                .iter()
                .filter(|(s, _)| s == status.as_str())
                .map(|(_, c)| *c)
                .sum(),
        })
        .collect()
}
