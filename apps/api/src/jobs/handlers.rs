//! Axum route handlers for the job tracker. All routes require a signed-in user
//! and only ever see that user's records.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::job::{JobDraft, JobRow, JobStatus, StatusCount};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRow>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct JobStatsResponse {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

fn job_not_found(job_id: Uuid) -> AppError {
    AppError::NotFound(format!("Job {job_id} not found"))
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<JobStatus>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(AppError::Validation),
    }
}

/// GET /api/v1/jobs?status=Applied
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobListResponse>, AppError> {
    let status = parse_status_filter(query.status.as_deref())?;
    let jobs = state.jobs.list(session.user_id, status).await?;
    Ok(Json(JobListResponse { jobs }))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(draft): Json<JobDraft>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let draft = draft.normalized().map_err(AppError::Validation)?;
    let job = state.jobs.create(session.user_id, &draft).await?;
    info!(user_id = %session.user_id, job_id = %job.id, "jobs: created");
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    state
        .jobs
        .get(session.user_id, job_id)
        .await?
        .map(Json)
        .ok_or_else(|| job_not_found(job_id))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(job_id): Path<Uuid>,
    Json(draft): Json<JobDraft>,
) -> Result<Json<JobRow>, AppError> {
    let draft = draft.normalized().map_err(AppError::Validation)?;
    state
        .jobs
        .update(session.user_id, job_id, &draft)
        .await?
        .map(Json)
        .ok_or_else(|| job_not_found(job_id))
}

/// PATCH /api/v1/jobs/:id/status
pub async fn handle_update_job_status(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(job_id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<JobRow>, AppError> {
    state
        .jobs
        .update_status(session.user_id, job_id, request.status)
        .await?
        .map(Json)
        .ok_or_else(|| job_not_found(job_id))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.jobs.delete(session.user_id, job_id).await? {
        return Err(job_not_found(job_id));
    }
    info!(user_id = %session.user_id, %job_id, "jobs: deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/jobs/stats
pub async fn handle_job_stats(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<Json<JobStatsResponse>, AppError> {
    let by_status = state.jobs.status_counts(session.user_id).await?;
    let total = by_status.iter().map(|s| s.count).sum();
    Ok(Json(JobStatsResponse { total, by_status }))
}
