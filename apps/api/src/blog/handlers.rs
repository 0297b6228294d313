//! Axum route handlers for the blog. Reads are public; writes require a
//! signed-in caller whose email is listed in `ADMIN_EMAILS`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{AuthUser, Session};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::blog::{BlogPostDraft, BlogPostRow, BlogPostSummary};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BlogListResponse {
    pub posts: Vec<BlogPostSummary>,
}

fn post_not_found(slug: &str) -> AppError {
    AppError::NotFound(format!("Post '{slug}' not found"))
}

fn require_admin(config: &Config, session: &Session) -> Result<(), AppError> {
    match session.email.as_deref() {
        Some(email) if config.is_admin(email) => Ok(()),
        _ => {
            warn!(user_id = %session.user_id, "blog: non-admin write attempt");
            Err(AppError::Forbidden)
        }
    }
}

/// GET /api/v1/blog
pub async fn handle_list_posts(
    State(state): State<AppState>,
) -> Result<Json<BlogListResponse>, AppError> {
    let posts = state.blog.list().await?;
    Ok(Json(BlogListResponse { posts }))
}

/// GET /api/v1/blog/:slug
pub async fn handle_get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPostRow>, AppError> {
    state
        .blog
        .get(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| post_not_found(&slug))
}

/// POST /api/v1/admin/blog
pub async fn handle_create_post(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(draft): Json<BlogPostDraft>,
) -> Result<(StatusCode, Json<BlogPostRow>), AppError> {
    require_admin(&state.config, &session)?;
    let draft = draft.normalized().map_err(AppError::Validation)?;
    let post = state.blog.create(&draft).await?;
    info!(slug = %post.slug, "blog: post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/v1/admin/blog/:slug
pub async fn handle_update_post(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(slug): Path<String>,
    Json(mut draft): Json<BlogPostDraft>,
) -> Result<Json<BlogPostRow>, AppError> {
    require_admin(&state.config, &session)?;
    if draft.slug.is_none() {
        draft.slug = Some(slug.clone());
    }
    let draft = draft.normalized().map_err(AppError::Validation)?;
    state
        .blog
        .update(&slug, &draft)
        .await?
        .map(Json)
        .ok_or_else(|| post_not_found(&slug))
}

/// DELETE /api/v1/admin/blog/:slug
pub async fn handle_delete_post(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    require_admin(&state.config, &session)?;
    if !state.blog.delete(&slug).await? {
        return Err(post_not_found(&slug));
    }
    info!(%slug, "blog: post deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
    };
    use chrono::{NaiveDate, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::testing::{token_for, SECRET};
    use crate::routes::build_router;
    use crate::state::testing::{TestDeps, ADMIN_EMAIL};

    use super::*;

    fn row(slug: &str) -> BlogPostRow {
        let now = Utc::now();
        BlogPostRow {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: "Beat the ATS".to_string(),
            author: "Editorial Team".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            excerpt: String::new(),
            content: "<p>Body</p>".to_string(),
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn admin_request(method: Method, uri: &str, email: &str, body: Value) -> Request<Body> {
        let token = token_for(
            &Uuid::new_v4().to_string(),
            Some(email),
            (Utc::now().timestamp() + 3600) as usize,
            SECRET,
        );
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(deps: TestDeps, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(deps.into_state())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_public_get_missing_post_is_404() {
        let mut deps = TestDeps::new();
        deps.blog.expect_get().returning(|_| Ok(None));
        let request = Request::builder()
            .uri("/api/v1/blog/nope")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(deps, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_create() {
        let mut deps = TestDeps::new();
        deps.blog.expect_create().never();
        let (status, body) = send(
            deps,
            admin_request(
                Method::POST,
                "/api/v1/admin/blog",
                "someone@example.com",
                json!({"title": "T", "author": "A", "content": "<p>x</p>"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_admin_create_derives_slug() {
        let mut deps = TestDeps::new();
        deps.blog
            .expect_create()
            .withf(|draft| draft.slug() == "beat-the-ats")
            .times(1)
            .returning(|draft| Ok(row(draft.slug())));
        let (status, body) = send(
            deps,
            admin_request(
                Method::POST,
                "/api/v1/admin/blog",
                ADMIN_EMAIL,
                json!({"title": "Beat the ATS", "author": "Editorial Team", "content": "<p>x</p>"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["slug"], "beat-the-ats");
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_409() {
        let mut deps = TestDeps::new();
        deps.blog
            .expect_create()
            .returning(|draft| Err(AppError::Conflict(format!("slug {}", draft.slug()))));
        let (status, body) = send(
            deps,
            admin_request(
                Method::POST,
                "/api/v1/admin/blog",
                ADMIN_EMAIL,
                json!({"slug": "taken", "title": "T", "author": "A", "content": "<p>x</p>"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_update_keeps_path_slug_when_body_has_none() {
        let mut deps = TestDeps::new();
        deps.blog
            .expect_update()
            .withf(|slug, draft| slug == "beat-the-ats" && draft.slug() == "beat-the-ats")
            .times(1)
            .returning(|slug, _| Ok(Some(row(slug))));
        let (status, _) = send(
            deps,
            admin_request(
                Method::PUT,
                "/api/v1/admin/blog/beat-the-ats",
                ADMIN_EMAIL,
                json!({"title": "Retitled", "author": "A", "content": "<p>x</p>"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
