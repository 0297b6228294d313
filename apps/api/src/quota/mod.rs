//! Free-tier usage quota.
//!
//! The admission rules live here as pure functions over a [`UserSnapshot`] and a
//! clock reading. They return a decision plus the ledger write it implies; the
//! [`gate::QuotaGate`] applies that write through a [`ledger::UsageLedger`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub mod gate;
pub mod handlers;
pub mod ledger;

/// Billable calls a free user may make per window (all features combined).
pub const FREE_TIER_LIMIT: u32 = 10;

/// Fixed reset window: 30 days, not calendar months.
pub const RESET_WINDOW_SECS: i64 = 30 * 24 * 3600;

pub fn reset_window() -> Duration {
    Duration::seconds(RESET_WINDOW_SECS)
}

// ────────────────────────────────────────────────────────────────────────────
// Features and counters
// ────────────────────────────────────────────────────────────────────────────

/// A billable, AI-backed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Resume,
    CoverLetter,
    JobMatch,
}

impl Feature {
    /// The ledger counter this feature draws from.
    pub fn counter(self) -> Counter {
        match self {
            Feature::Resume => Counter::ResumeGenerations,
            Feature::CoverLetter => Counter::CoverLetterGenerations,
            Feature::JobMatch => Counter::JobMatchAnalyses,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Resume => "resume",
            Feature::CoverLetter => "cover_letter",
            Feature::JobMatch => "job_match",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three usage counters stored on the user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    ResumeGenerations,
    CoverLetterGenerations,
    JobMatchAnalyses,
}

impl Counter {
    /// Column backing this counter in the `users` table.
    pub fn column(self) -> &'static str {
        match self {
            Counter::ResumeGenerations => "resume_generations",
            Counter::CoverLetterGenerations => "cover_letter_generations",
            Counter::JobMatchAnalyses => "job_match_analyses",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tier and ledger snapshot
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Free,
    Active,
    Canceled,
    Incomplete,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Free => "free",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
        }
    }

    /// Only an active subscription lifts the quota; canceled and incomplete
    /// subscriptions are metered like free accounts.
    pub fn is_paid(self) -> bool {
        self == SubscriptionStatus::Active
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionStatus::Free),
            "active" => Ok(SubscriptionStatus::Active),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "incomplete" => Ok(SubscriptionStatus::Incomplete),
            other => Err(format!("unknown subscription status '{other}'")),
        }
    }
}

/// Monthly usage counters plus the time they were last zeroed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub resume_generations: u32,
    pub cover_letter_generations: u32,
    pub job_match_analyses: u32,
    pub last_reset: DateTime<Utc>,
}

impl Usage {
    pub fn fresh(at: DateTime<Utc>) -> Self {
        Self {
            resume_generations: 0,
            cover_letter_generations: 0,
            job_match_analyses: 0,
            last_reset: at,
        }
    }

    pub fn get(&self, counter: Counter) -> u32 {
        match counter {
            Counter::ResumeGenerations => self.resume_generations,
            Counter::CoverLetterGenerations => self.cover_letter_generations,
            Counter::JobMatchAnalyses => self.job_match_analyses,
        }
    }

    pub fn total(&self) -> u32 {
        self.resume_generations
            .saturating_add(self.cover_letter_generations)
            .saturating_add(self.job_match_analyses)
    }

    pub fn is_due_for_reset(&self, now: DateTime<Utc>) -> bool {
        now - self.last_reset > reset_window()
    }

    /// Applies a mutation in memory, mirroring what the ledger persists.
    pub fn apply(&mut self, mutation: &LedgerMutation) {
        match *mutation {
            LedgerMutation::Reset { at, .. } => {
                self.resume_generations = 0;
                self.cover_letter_generations = 0;
                self.job_match_analyses = 0;
                self.last_reset = self.last_reset.max(at);
            }
            LedgerMutation::Increment(counter) => {
                let slot = match counter {
                    Counter::ResumeGenerations => &mut self.resume_generations,
                    Counter::CoverLetterGenerations => &mut self.cover_letter_generations,
                    Counter::JobMatchAnalyses => &mut self.job_match_analyses,
                };
                *slot = slot.saturating_add(1);
            }
        }
    }
}

/// The slice of a user record the quota rules read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSnapshot {
    pub subscription_status: SubscriptionStatus,
    pub usage: Usage,
}

// ────────────────────────────────────────────────────────────────────────────
// Decisions
// ────────────────────────────────────────────────────────────────────────────

/// A write the gate must persist to the usage ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMutation {
    /// Zero all counters. `observed` is the `last_reset` the decision was
    /// based on; the store only applies the reset if it is still current.
    Reset {
        observed: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    Increment(Counter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    Anonymous,
    Paid,
    WindowReset,
    WithinLimit,
    LimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDecision {
    pub admission: Admission,
    pub mutation: Option<LedgerMutation>,
}

impl QuotaDecision {
    pub fn admitted(&self) -> bool {
        self.admission != Admission::LimitReached
    }

    /// Callers show the upgrade dialog when this is set.
    pub fn show_paywall(&self) -> bool {
        !self.admitted()
    }
}

/// Admission check for one billable call.
pub fn evaluate_check(user: Option<&UserSnapshot>, now: DateTime<Utc>) -> QuotaDecision {
    let Some(user) = user else {
        return QuotaDecision {
            admission: Admission::Anonymous,
            mutation: None,
        };
    };

    if user.subscription_status.is_paid() {
        return QuotaDecision {
            admission: Admission::Paid,
            mutation: None,
        };
    }

    if user.usage.is_due_for_reset(now) {
        // The resetting call itself is free.
        return QuotaDecision {
            admission: Admission::WindowReset,
            mutation: Some(LedgerMutation::Reset {
                observed: user.usage.last_reset,
                at: now,
            }),
        };
    }

    let admission = if user.usage.total() < FREE_TIER_LIMIT {
        Admission::WithinLimit
    } else {
        Admission::LimitReached
    };

    QuotaDecision {
        admission,
        mutation: None,
    }
}

/// Ledger write that records one successful call, if the caller is metered.
pub fn evaluate_increment(user: Option<&UserSnapshot>, feature: Feature) -> Option<LedgerMutation> {
    match user {
        Some(user) if !user.subscription_status.is_paid() => {
            Some(LedgerMutation::Increment(feature.counter()))
        }
        _ => None,
    }
}

/// Read-only view of the ledger for the account page.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub subscription_status: SubscriptionStatus,
    pub unlimited: bool,
    pub resume_generations: u32,
    pub cover_letter_generations: u32,
    pub job_match_analyses: u32,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub last_reset: DateTime<Utc>,
    pub next_reset: DateTime<Utc>,
}

pub fn summarize(user: &UserSnapshot, now: DateTime<Utc>) -> UsageSummary {
    // A window that has already elapsed reads as zero; the next check persists it.
    let usage = if user.usage.is_due_for_reset(now) {
        Usage::fresh(now)
    } else {
        user.usage.clone()
    };
    let used = usage.total();
    UsageSummary {
        subscription_status: user.subscription_status,
        unlimited: user.subscription_status.is_paid(),
        resume_generations: usage.resume_generations,
        cover_letter_generations: usage.cover_letter_generations,
        job_match_analyses: usage.job_match_analyses,
        used,
        limit: FREE_TIER_LIMIT,
        remaining: FREE_TIER_LIMIT.saturating_sub(used),
        last_reset: usage.last_reset,
        next_reset: usage.last_reset + reset_window(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_user(resume: u32, cover: u32, matches: u32, last_reset: DateTime<Utc>) -> UserSnapshot {
        UserSnapshot {
            subscription_status: SubscriptionStatus::Free,
            usage: Usage {
                resume_generations: resume,
                cover_letter_generations: cover,
                job_match_analyses: matches,
                last_reset,
            },
        }
    }

    #[test]
    fn test_anonymous_is_admitted_without_mutation() {
        let decision = evaluate_check(None, Utc::now());
        assert_eq!(decision.admission, Admission::Anonymous);
        assert!(decision.admitted());
        assert!(decision.mutation.is_none());
        assert!(evaluate_increment(None, Feature::Resume).is_none());
    }

    #[test]
    fn test_active_subscriber_is_never_metered() {
        let now = Utc::now();
        let mut user = free_user(50, 50, 50, now);
        user.subscription_status = SubscriptionStatus::Active;
        let decision = evaluate_check(Some(&user), now);
        assert_eq!(decision.admission, Admission::Paid);
        assert!(decision.mutation.is_none());
        assert!(evaluate_increment(Some(&user), Feature::JobMatch).is_none());
    }

    #[test]
    fn test_canceled_and_incomplete_are_metered() {
        let now = Utc::now();
        for status in [SubscriptionStatus::Canceled, SubscriptionStatus::Incomplete] {
            let mut user = free_user(10, 0, 0, now);
            user.subscription_status = status;
            assert_eq!(
                evaluate_check(Some(&user), now).admission,
                Admission::LimitReached
            );
        }
    }

    #[test]
    fn test_limit_counts_all_features_together() {
        let now = Utc::now();
        let user = free_user(4, 3, 2, now);
        assert_eq!(
            evaluate_check(Some(&user), now).admission,
            Admission::WithinLimit
        );

        let user = free_user(4, 3, 3, now);
        let decision = evaluate_check(Some(&user), now);
        assert_eq!(decision.admission, Admission::LimitReached);
        assert!(decision.show_paywall());
        assert!(decision.mutation.is_none());
    }

    #[test]
    fn test_elapsed_window_resets_and_admits() {
        let now = Utc::now();
        let last_reset = now - Duration::days(40);
        let user = free_user(10, 5, 5, last_reset);
        let decision = evaluate_check(Some(&user), now);
        assert_eq!(decision.admission, Admission::WindowReset);
        assert_eq!(
            decision.mutation,
            Some(LedgerMutation::Reset {
                observed: last_reset,
                at: now
            })
        );
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let now = Utc::now();
        let user = free_user(10, 0, 0, now - reset_window());
        assert_eq!(
            evaluate_check(Some(&user), now).admission,
            Admission::LimitReached,
            "exactly 30 days elapsed is not yet a reset"
        );

        let user = free_user(10, 0, 0, now - reset_window() - Duration::seconds(1));
        assert_eq!(
            evaluate_check(Some(&user), now).admission,
            Admission::WindowReset
        );
    }

    #[test]
    fn test_feature_counter_mapping() {
        assert_eq!(Feature::Resume.counter(), Counter::ResumeGenerations);
        assert_eq!(Feature::CoverLetter.counter(), Counter::CoverLetterGenerations);
        assert_eq!(Feature::JobMatch.counter(), Counter::JobMatchAnalyses);
        assert_eq!(Counter::JobMatchAnalyses.column(), "job_match_analyses");
    }

    #[test]
    fn test_apply_reset_never_moves_last_reset_backwards() {
        let now = Utc::now();
        let mut usage = Usage::fresh(now);
        usage.apply(&LedgerMutation::Increment(Counter::ResumeGenerations));
        usage.apply(&LedgerMutation::Reset {
            observed: now,
            at: now - Duration::days(1),
        });
        assert_eq!(usage.total(), 0);
        assert_eq!(usage.last_reset, now);
    }

    #[test]
    fn test_summary_reports_remaining_calls() {
        let now = Utc::now();
        let summary = summarize(&free_user(3, 1, 0, now), now);
        assert_eq!(summary.used, 4);
        assert_eq!(summary.remaining, 6);
        assert_eq!(summary.next_reset, now + reset_window());
        assert!(!summary.unlimited);
    }

    #[test]
    fn test_total_saturates_on_huge_counters() {
        let now = Utc::now();
        let user = free_user(u32::MAX, u32::MAX, 5, now);
        assert_eq!(user.usage.total(), u32::MAX);
        let summary = summarize(&user, now);
        assert_eq!(summary.remaining, 0);
    }

    #[test]
    fn test_summary_treats_elapsed_window_as_empty() {
        let now = Utc::now();
        let summary = summarize(&free_user(10, 0, 0, now - Duration::days(31)), now);
        assert_eq!(summary.used, 0);
        assert_eq!(summary.remaining, FREE_TIER_LIMIT);
    }

    #[test]
    fn test_subscription_status_round_trips_through_text() {
        for status in [
            SubscriptionStatus::Free,
            SubscriptionStatus::Active,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Incomplete,
        ] {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>(), Ok(status));
        }
        assert!("past_due".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn test_feature_serde_names() {
        let feature: Feature = serde_json::from_str(r#""cover_letter""#).unwrap();
        assert_eq!(feature, Feature::CoverLetter);
        assert_eq!(Feature::JobMatch.to_string(), "job_match");
    }
}
