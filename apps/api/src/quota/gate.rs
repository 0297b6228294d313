//! Quota gate. Admits or denies billable calls and keeps the usage ledger current.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::quota::ledger::UsageLedger;
use crate::quota::{
    evaluate_check, evaluate_increment, summarize, Feature, QuotaDecision, UsageSummary,
    UserSnapshot,
};

/// Check-then-increment is two independent round trips: concurrent calls from
/// one user can all pass `check_usage` before any of them increments.
#[derive(Clone)]
pub struct QuotaGate {
    ledger: Arc<dyn UsageLedger>,
}

impl QuotaGate {
    pub fn new(ledger: Arc<dyn UsageLedger>) -> Self {
        Self { ledger }
    }

    pub async fn check_usage(
        &self,
        user_id: Option<Uuid>,
        feature: Feature,
    ) -> Result<QuotaDecision, AppError> {
        self.check_usage_at(user_id, feature, Utc::now()).await
    }

    pub async fn check_usage_at(
        &self,
        user_id: Option<Uuid>,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, AppError> {
        let snapshot = self.load(user_id).await?;
        let decision = evaluate_check(snapshot.as_ref(), now);

        if let (Some(user_id), Some(mutation)) = (user_id, decision.mutation) {
            self.ledger.apply(user_id, mutation).await?;
            info!(?user_id, %feature, "usage: window elapsed, counters reset");
        }

        if decision.admitted() {
            debug!(?user_id, %feature, admission = ?decision.admission, "usage: admitted");
        } else {
            info!(?user_id, %feature, "usage: free tier limit reached");
        }

        Ok(decision)
    }

    /// Records one successful call. No-op for anonymous and paid callers.
    pub async fn increment_usage(
        &self,
        user_id: Option<Uuid>,
        feature: Feature,
    ) -> Result<(), AppError> {
        let snapshot = self.load(user_id).await?;
        if let (Some(user_id), Some(mutation)) =
            (user_id, evaluate_increment(snapshot.as_ref(), feature))
        {
            self.ledger.apply(user_id, mutation).await?;
            debug!(%user_id, %feature, "usage: counter incremented");
        }
        Ok(())
    }

    pub async fn usage_summary(&self, user_id: Uuid) -> Result<UsageSummary, AppError> {
        let snapshot = self
            .ledger
            .snapshot(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;
        Ok(summarize(&snapshot, Utc::now()))
    }

    async fn load(&self, user_id: Option<Uuid>) -> Result<Option<UserSnapshot>, AppError> {
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        let snapshot = self.ledger.snapshot(user_id).await?;
        if snapshot.is_none() {
            // Signed in but never completed signup: treated like an anonymous caller.
            warn!(%user_id, "usage: no user record for authenticated caller");
        }
        Ok(snapshot)
    }
}
