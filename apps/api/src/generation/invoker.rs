//! Feature invoker: runs one billable AI action end to end.
//!
//! Flow: validate input → quota check → primary flow and job-metadata
//! extraction issued together → increment usage → auto-track job → respond.
//!
//! Extraction is best-effort: its failures are folded into "no metadata"
//! inside its own future, so only a primary failure fails the pair.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::flows::{FeatureInput, GeneratedContent, GenerationBackend, JobMetadata};
use crate::jobs::store::JobStore;
use crate::llm_client::LlmError;
use crate::models::job::{JobDraft, JobStatus};
use crate::quota::gate::QuotaGate;
use crate::quota::Feature;

/// Status given to jobs created from a generation.
pub const AUTO_TRACKED_STATUS: JobStatus = JobStatus::Saved;

#[derive(Debug, Clone, Serialize)]
pub struct InvocationOutcome {
    pub feature: Feature,
    pub result: GeneratedContent,
    /// Job record created from the posting, if one was tracked.
    pub tracked_job_id: Option<Uuid>,
}

pub struct FeatureInvoker<'a> {
    pub gate: &'a QuotaGate,
    pub flows: &'a dyn GenerationBackend,
    pub jobs: &'a dyn JobStore,
}

impl FeatureInvoker<'_> {
    pub async fn invoke(
        &self,
        user_id: Option<Uuid>,
        feature: Feature,
        input: FeatureInput,
    ) -> Result<InvocationOutcome, AppError> {
        // Validation runs before any network call.
        let input = input.validated().map_err(AppError::Validation)?;

        let decision = self.gate.check_usage(user_id, feature).await?;
        if !decision.admitted() {
            return Err(AppError::QuotaExceeded(feature));
        }

        let extraction = async {
            match self.flows.extract_job_metadata(&input.job_description).await {
                Ok(metadata) => Ok::<_, LlmError>(Some(metadata)),
                Err(e) => {
                    warn!(%feature, "generation: job metadata extraction failed, skipping tracking: {e}");
                    Ok(None)
                }
            }
        };

        let (result, metadata) = tokio::try_join!(self.flows.generate(feature, &input), extraction)
            .map_err(|e| AppError::Llm(format!("{feature} generation failed: {e}")))?;

        // Counted before tracking so a failed increment leaves no job row behind.
        self.gate.increment_usage(user_id, feature).await?;

        let tracked_job_id = match (user_id, metadata) {
            (Some(user_id), Some(metadata)) => {
                self.track_job(user_id, metadata, &input.job_description)
                    .await
            }
            _ => None,
        };

        info!(?user_id, %feature, ?tracked_job_id, "generation: feature completed");

        Ok(InvocationOutcome {
            feature,
            result,
            tracked_job_id,
        })
    }

    /// Creates the tracker entry for a generation. Failures only skip tracking.
    async fn track_job(
        &self,
        user_id: Uuid,
        metadata: JobMetadata,
        job_description: &str,
    ) -> Option<Uuid> {
        if !metadata.is_trackable() {
            info!(%user_id, "generation: posting lacks company or title, not tracking");
            return None;
        }

        let draft = JobDraft {
            company: metadata.company.trim().to_string(),
            title: metadata.title.trim().to_string(),
            location: metadata.location.trim().to_string(),
            application_date: None,
            status: AUTO_TRACKED_STATUS,
            notes: String::new(),
            job_description: Some(job_description.to_string()),
        };

        match self.jobs.create(user_id, &draft).await {
            Ok(job) => Some(job.id),
            Err(e) => {
                warn!(%user_id, "generation: failed to auto-track job: {e}");
                None
            }
        }
    }
}
