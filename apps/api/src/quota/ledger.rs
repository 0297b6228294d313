//! Usage ledger: persistence for the quota counters on the user row.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::quota::{LedgerMutation, UserSnapshot};
use crate::users::store::{PgUserStore, UserStore};

/// Carried in `AppState` as `Arc<dyn UsageLedger>`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Reads the tier and counters for a user, `None` if the user has no record.
    async fn snapshot(&self, user_id: Uuid) -> Result<Option<UserSnapshot>, AppError>;

    /// Persists one ledger mutation.
    async fn apply(&self, user_id: Uuid, mutation: LedgerMutation) -> Result<(), AppError>;
}

#[async_trait]
impl UsageLedger for PgUserStore {
    async fn snapshot(&self, user_id: Uuid) -> Result<Option<UserSnapshot>, AppError> {
        let user = self.find(user_id).await?;
        Ok(user.map(|u| u.snapshot()))
    }

    async fn apply(&self, user_id: Uuid, mutation: LedgerMutation) -> Result<(), AppError> {
        match mutation {
            LedgerMutation::Reset { observed, at } => {
                // Precondition on the observed reset time: of two concurrent resets
                // only the first lands, and last_reset never moves backwards.
                let result = sqlx::query(
                    r#"
                    UPDATE users
                    SET resume_generations = 0,
                        cover_letter_generations = 0,
                        job_match_analyses = 0,
                        last_reset = GREATEST(last_reset, $2),
                        updated_at = now()
                    WHERE id = $1 AND last_reset = $3
                    "#,
                )
                .bind(user_id)
                .bind(at)
                .bind(observed)
                .execute(self.pool())
                .await?;

                if result.rows_affected() == 0 {
                    debug!(%user_id, "usage: reset already applied by a concurrent request");
                }
            }
            LedgerMutation::Increment(counter) => {
                let column = counter.column();
                let sql = format!(
                    "UPDATE users SET {column} = {column} + 1, updated_at = now() WHERE id = $1"
                );
                sqlx::query(&sql).bind(user_id).execute(self.pool()).await?;
            }
        }
        Ok(())
    }
}
