use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

use crate::quota::{SubscriptionStatus, Usage, UserSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub subscription_status: String,
    pub stripe_customer_id: Option<String>,
    pub lemonsqueezy_customer_id: Option<String>,
    pub resume_content: Option<String>,
    pub target_role: Option<String>,
    pub onboarding_complete: bool,
    pub resume_generations: i32,
    pub cover_letter_generations: i32,
    pub job_match_analyses: i32,
    pub last_reset: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn status(&self) -> SubscriptionStatus {
        self.subscription_status.parse().unwrap_or_else(|e| {
            warn!(user_id = %self.id, "{e}; treating account as free");
            SubscriptionStatus::Free
        })
    }

    pub fn usage(&self) -> Usage {
        Usage {
            resume_generations: self.resume_generations.max(0) as u32,
            cover_letter_generations: self.cover_letter_generations.max(0) as u32,
            job_match_analyses: self.job_match_analyses.max(0) as u32,
            last_reset: self.last_reset,
        }
    }

    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            subscription_status: self.status(),
            usage: self.usage(),
        }
    }
}

/// Profile fields a user can set during onboarding. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OnboardingUpdate {
    pub display_name: Option<String>,
    pub target_role: Option<String>,
    pub resume_content: Option<String>,
}

/// Profile as returned to the account page.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub target_role: Option<String>,
    pub onboarding_complete: bool,
    pub has_resume: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRow> for Profile {
    fn from(row: &UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email.clone(),
            display_name: row.display_name.clone(),
            subscription_status: row.status(),
            target_role: row.target_role.clone(),
            onboarding_complete: row.onboarding_complete,
            has_resume: row
                .resume_content
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty()),
            created_at: row.created_at,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::user_row;
    use super::*;

    #[test]
    fn test_unknown_status_falls_back_to_free() {
        let row = user_row(Uuid::new_v4(), "past_due");
        assert_eq!(row.status(), SubscriptionStatus::Free);
    }

    #[test]
    fn test_snapshot_clamps_negative_counters() {
        let mut row = user_row(Uuid::new_v4(), "free");
        row.resume_generations = -3;
        row.job_match_analyses = 2;
        let snapshot = row.snapshot();
        assert_eq!(snapshot.usage.resume_generations, 0);
        assert_eq!(snapshot.usage.total(), 2);
    }

    #[test]
    fn test_profile_has_resume_ignores_whitespace() {
        let mut row = user_row(Uuid::new_v4(), "active");
        row.resume_content = Some("   \n".to_string());
        assert!(!Profile::from(&row).has_resume);
        row.resume_content = Some("Jane Doe, Engineer".to_string());
        let profile = Profile::from(&row);
        assert!(profile.has_resume);
        assert_eq!(profile.subscription_status, SubscriptionStatus::Active);
    }
}
