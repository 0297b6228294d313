//! Axum route handlers for the signed-in user's own account: signup,
//! profile, onboarding and the stored résumé.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{OnboardingUpdate, Profile, UserRow};
use crate::quota::{summarize, UsageSummary};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    /// Falls back to the token's `email` claim.
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub profile: Profile,
    pub usage: UsageSummary,
}

impl From<&UserRow> for AccountResponse {
    fn from(row: &UserRow) -> Self {
        Self {
            profile: Profile::from(row),
            usage: summarize(&row.snapshot(), Utc::now()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResumeDocument {
    pub resume_content: Option<String>,
}

fn user_not_found(user_id: Uuid) -> AppError {
    AppError::NotFound(format!("User {user_id} not found"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /api/v1/me
///
/// Creates the account for the token identity on first sign-in. Repeat calls
/// return the existing account unchanged.
pub async fn handle_signup(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(request): Json<SignupRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let email = non_blank(request.email)
        .or_else(|| non_blank(session.email.clone()))
        .ok_or_else(|| AppError::Validation("email is required".to_string()))?;

    let user = state.users.create_if_absent(session.user_id, &email).await?;
    info!(user_id = %user.id, "users: account ready");
    Ok(Json(AccountResponse::from(&user)))
}

/// GET /api/v1/me
pub async fn handle_get_account(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<Json<AccountResponse>, AppError> {
    let user = state
        .users
        .find(session.user_id)
        .await?
        .ok_or_else(|| user_not_found(session.user_id))?;
    Ok(Json(AccountResponse::from(&user)))
}

/// PATCH /api/v1/me/onboarding
pub async fn handle_onboarding(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(update): Json<OnboardingUpdate>,
) -> Result<Json<Profile>, AppError> {
    let update = OnboardingUpdate {
        display_name: non_blank(update.display_name),
        target_role: non_blank(update.target_role),
        resume_content: non_blank(update.resume_content),
    };
    let user = state
        .users
        .merge_onboarding(session.user_id, &update)
        .await?
        .ok_or_else(|| user_not_found(session.user_id))?;
    Ok(Json(Profile::from(&user)))
}

/// GET /api/v1/me/resume
pub async fn handle_get_resume(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<Json<ResumeDocument>, AppError> {
    let user = state
        .users
        .find(session.user_id)
        .await?
        .ok_or_else(|| user_not_found(session.user_id))?;
    Ok(Json(ResumeDocument {
        resume_content: user.resume_content,
    }))
}

/// PUT /api/v1/me/resume
pub async fn handle_put_resume(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(document): Json<ResumeDocument>,
) -> Result<Json<ResumeDocument>, AppError> {
    let content = non_blank(document.resume_content)
        .ok_or_else(|| AppError::Validation("resume_content cannot be empty".to_string()))?;
    let user = state
        .users
        .set_resume_content(session.user_id, &content)
        .await?
        .ok_or_else(|| user_not_found(session.user_id))?;
    Ok(Json(ResumeDocument {
        resume_content: user.resume_content,
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::models::user::fixtures::user_row;
    use crate::routes::build_router;
    use crate::state::testing::{bearer, TestDeps};

    async fn send(deps: TestDeps, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(deps.into_state())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: Method, uri: &str, user_id: Uuid, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, bearer(user_id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_signup_uses_token_email_when_body_has_none() {
        let user_id = Uuid::new_v4();
        let mut deps = TestDeps::new();
        deps.users
            .expect_create_if_absent()
            .withf(move |id, email| *id == user_id && email == "ada@example.com")
            .times(1)
            .returning(|id, _| Ok(user_row(id, "free")));

        let (status, body) = send(
            deps,
            json_request(Method::POST, "/api/v1/me", user_id, json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile"]["subscription_status"], "free");
        assert_eq!(body["usage"]["remaining"], 10);
    }

    #[tokio::test]
    async fn test_get_account_without_token_is_401() {
        let (status, body) = send(
            TestDeps::new(),
            Request::builder()
                .uri("/api/v1/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_get_account_missing_user_is_404() {
        let mut deps = TestDeps::new();
        deps.users.expect_find().returning(|_| Ok(None));
        let user_id = Uuid::new_v4();
        let request = Request::builder()
            .uri("/api/v1/me")
            .header(header::AUTHORIZATION, bearer(user_id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(deps, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_onboarding_drops_blank_fields() {
        let user_id = Uuid::new_v4();
        let mut deps = TestDeps::new();
        deps.users
            .expect_merge_onboarding()
            .withf(|_, update| {
                update.display_name.as_deref() == Some("Ada")
                    && update.target_role.is_none()
                    && update.resume_content.is_none()
            })
            .times(1)
            .returning(|id, _| {
                let mut row = user_row(id, "free");
                row.onboarding_complete = true;
                Ok(Some(row))
            });

        let (status, body) = send(
            deps,
            json_request(
                Method::PATCH,
                "/api/v1/me/onboarding",
                user_id,
                json!({"display_name": " Ada ", "target_role": "   "}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["onboarding_complete"], true);
    }

    #[tokio::test]
    async fn test_put_resume_rejects_blank_content() {
        let mut deps = TestDeps::new();
        deps.users.expect_set_resume_content().never();
        let (status, body) = send(
            deps,
            json_request(
                Method::PUT,
                "/api/v1/me/resume",
                Uuid::new_v4(),
                json!({"resume_content": "  "}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
