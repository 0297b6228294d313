use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{OnboardingUpdate, UserRow};

/// Profile-side access to the `users` table.
/// Carried in `AppState` as `Arc<dyn UserStore>`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, user_id: Uuid) -> Result<Option<UserRow>, AppError>;

    /// Creates a free account with zeroed counters if none exists. Idempotent.
    async fn create_if_absent(&self, user_id: Uuid, email: &str) -> Result<UserRow, AppError>;

    async fn merge_onboarding(
        &self,
        user_id: Uuid,
        update: &OnboardingUpdate,
    ) -> Result<Option<UserRow>, AppError>;

    async fn set_resume_content(
        &self,
        user_id: Uuid,
        content: &str,
    ) -> Result<Option<UserRow>, AppError>;
}

/// PostgreSQL-backed store for user records. Also implements the usage ledger
/// and the subscriber lookup used by the webhook reconciler.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find(&self, user_id: Uuid) -> Result<Option<UserRow>, AppError> {
        Ok(
            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_if_absent(&self, user_id: Uuid, email: &str) -> Result<UserRow, AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, subscription_status, last_reset)
            VALUES ($1, $2, 'free', now())
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(email)
        .execute(&self.pool)
        .await?;

        self.find(user_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("user {user_id} vanished after insert")))
    }

    async fn merge_onboarding(
        &self,
        user_id: Uuid,
        update: &OnboardingUpdate,
    ) -> Result<Option<UserRow>, AppError> {
        Ok(sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET display_name = COALESCE($2, display_name),
                target_role = COALESCE($3, target_role),
                resume_content = COALESCE($4, resume_content),
                onboarding_complete = TRUE,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(update.display_name.as_deref())
        .bind(update.target_role.as_deref())
        .bind(update.resume_content.as_deref())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_resume_content(
        &self,
        user_id: Uuid,
        content: &str,
    ) -> Result<Option<UserRow>, AppError> {
        Ok(sqlx::query_as::<_, UserRow>(
            "UPDATE users SET resume_content = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?)
    }
}
