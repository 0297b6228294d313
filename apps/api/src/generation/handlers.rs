//! Axum route handlers for the AI features. Open to anonymous callers; signed-in
//! callers are metered by the quota gate and get postings auto-tracked.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::auth::MaybeUser;
use crate::errors::AppError;
use crate::generation::flows::FeatureInput;
use crate::generation::invoker::{FeatureInvoker, InvocationOutcome};
use crate::quota::Feature;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeatureRequest {
    /// Omitted by signed-in users who saved a résumé during onboarding.
    #[serde(default)]
    pub resume_text: Option<String>,
    pub job_description: String,
}

/// POST /api/v1/ai/resume
pub async fn handle_tailor_resume(
    State(state): State<AppState>,
    user: MaybeUser,
    Json(request): Json<FeatureRequest>,
) -> Result<Json<InvocationOutcome>, AppError> {
    run_feature(&state, user, Feature::Resume, request).await
}

/// POST /api/v1/ai/cover-letter
pub async fn handle_cover_letter(
    State(state): State<AppState>,
    user: MaybeUser,
    Json(request): Json<FeatureRequest>,
) -> Result<Json<InvocationOutcome>, AppError> {
    run_feature(&state, user, Feature::CoverLetter, request).await
}

/// POST /api/v1/ai/job-match
pub async fn handle_job_match(
    State(state): State<AppState>,
    user: MaybeUser,
    Json(request): Json<FeatureRequest>,
) -> Result<Json<InvocationOutcome>, AppError> {
    run_feature(&state, user, Feature::JobMatch, request).await
}

async fn run_feature(
    state: &AppState,
    MaybeUser(session): MaybeUser,
    feature: Feature,
    request: FeatureRequest,
) -> Result<Json<InvocationOutcome>, AppError> {
    let user_id = session.map(|s| s.user_id);

    let resume_text = match (request.resume_text, user_id) {
        (Some(text), _) if !text.trim().is_empty() => text,
        (_, Some(user_id)) => state
            .users
            .find(user_id)
            .await?
            .and_then(|u| u.resume_content)
            .unwrap_or_default(),
        (_, None) => String::new(),
    };

    let invoker = FeatureInvoker {
        gate: &state.quota,
        flows: state.flows.as_ref(),
        jobs: state.jobs.as_ref(),
    };
    let outcome = invoker
        .invoke(
            user_id,
            feature,
            FeatureInput {
                resume_text,
                job_description: request.job_description,
            },
        )
        .await?;

    Ok(Json(outcome))
}
