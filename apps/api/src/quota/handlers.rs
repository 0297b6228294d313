use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::quota::UsageSummary;
use crate::state::AppState;

/// GET /api/v1/usage
///
/// Counters, remaining free calls and the next reset time for the caller.
pub async fn handle_usage(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<Json<UsageSummary>, AppError> {
    let summary = state.quota.usage_summary(session.user_id).await?;
    Ok(Json(summary))
}
