pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::billing::handlers as billing;
use crate::blog::handlers as blog;
use crate::generation::handlers as generation;
use crate::jobs::handlers as jobs;
use crate::quota::handlers as quota;
use crate::state::AppState;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Account
        .route(
            "/api/v1/me",
            get(users::handle_get_account).post(users::handle_signup),
        )
        .route("/api/v1/me/onboarding", patch(users::handle_onboarding))
        .route(
            "/api/v1/me/resume",
            get(users::handle_get_resume).put(users::handle_put_resume),
        )
        .route("/api/v1/usage", get(quota::handle_usage))
        // AI features (quota-gated)
        .route("/api/v1/ai/resume", post(generation::handle_tailor_resume))
        .route(
            "/api/v1/ai/cover-letter",
            post(generation::handle_cover_letter),
        )
        .route("/api/v1/ai/job-match", post(generation::handle_job_match))
        // Job tracker
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/stats", get(jobs::handle_job_stats))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route(
            "/api/v1/jobs/:id/status",
            patch(jobs::handle_update_job_status),
        )
        // Blog
        .route("/api/v1/blog", get(blog::handle_list_posts))
        .route("/api/v1/blog/:slug", get(blog::handle_get_post))
        .route("/api/v1/admin/blog", post(blog::handle_create_post))
        .route(
            "/api/v1/admin/blog/:slug",
            put(blog::handle_update_post).delete(blog::handle_delete_post),
        )
        // Billing
        .route("/api/v1/billing/checkout", post(billing::handle_checkout))
        .route("/api/v1/billing/portal", post(billing::handle_portal))
        .route(
            "/api/webhooks/stripe",
            post(billing::handle_stripe_webhook),
        )
        .route(
            "/api/webhooks/lemonsqueezy",
            post(billing::handle_lemonsqueezy_webhook),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::billing::stripe::CheckoutRequest;
    use crate::models::job::JobStatus;
    use crate::models::user::fixtures::user_row;
    use crate::quota::{SubscriptionStatus, Usage, UserSnapshot};
    use crate::state::testing::{bearer, TestDeps};

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

    fn authed(method: Method, uri: &str, user_id: Uuid, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, bearer(user_id));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(
            TestDeps::new(),
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_usage_reads_as_fresh_after_window() {
        let user_id = Uuid::new_v4();
        let deps = TestDeps::new();
        deps.ledger.insert(
            user_id,
            UserSnapshot {
                subscription_status: SubscriptionStatus::Free,
                usage: Usage {
                    resume_generations: 7,
                    cover_letter_generations: 3,
                    job_match_analyses: 0,
                    last_reset: Utc::now() - Duration::days(40),
                },
            },
        );
        let (status, body) = send(deps, authed(Method::GET, "/api/v1/usage", user_id, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["used"], 0);
        assert_eq!(body["remaining"], 10);
    }

    #[tokio::test]
    async fn test_other_users_job_is_404() {
        let mut deps = TestDeps::new();
        deps.jobs.expect_get().returning(|_, _| Ok(None));
        let uri = format!("/api/v1/jobs/{}", Uuid::new_v4());
        let (status, body) = send(deps, authed(Method::GET, &uri, Uuid::new_v4(), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_job_requires_title() {
        let mut deps = TestDeps::new();
        deps.jobs.expect_create().never();
        let (status, _) = send(
            deps,
            authed(
                Method::POST,
                "/api/v1/jobs",
                Uuid::new_v4(),
                Some(json!({"company": "Acme", "title": " "})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_job_stats_totals_every_stage() {
        let mut deps = TestDeps::new();
        deps.jobs.expect_status_counts().returning(|_| {
            Ok(crate::jobs::store::fill_status_counts(vec![
                ("Applied".to_string(), 2),
                ("Saved".to_string(), 4),
            ]))
        });
        let (status, body) = send(
            deps,
            authed(Method::GET, "/api/v1/jobs/stats", Uuid::new_v4(), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 6);
        assert_eq!(body["by_status"].as_array().unwrap().len(), JobStatus::ALL.len());
    }

    #[tokio::test]
    async fn test_checkout_for_another_user_is_forbidden() {
        let mut deps = TestDeps::new();
        deps.payments.expect_create_checkout_session().never();
        let (status, _) = send(
            deps,
            authed(
                Method::POST,
                "/api/v1/billing/checkout",
                Uuid::new_v4(),
                Some(json!({
                    "priceId": "price_pro",
                    "userId": Uuid::new_v4(),
                    "email": "ada@example.com"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_checkout_reuses_stored_customer() {
        let user_id = Uuid::new_v4();
        let mut deps = TestDeps::new();
        deps.users.expect_find().returning(|id| {
            let mut row = user_row(id, "canceled");
            row.stripe_customer_id = Some("cus_existing".to_string());
            Ok(Some(row))
        });
        deps.payments
            .expect_create_checkout_session()
            .withf(move |req: &CheckoutRequest| {
                req.user_id == user_id && req.customer_id.as_deref() == Some("cus_existing")
            })
            .times(1)
            .returning(|_| Ok("cs_test_123".to_string()));

        let (status, body) = send(
            deps,
            authed(
                Method::POST,
                "/api/v1/billing/checkout",
                user_id,
                Some(json!({"priceId": "price_pro", "userId": user_id, "email": "ada@example.com"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], "cs_test_123");
    }

    #[tokio::test]
    async fn test_portal_without_customer_is_400() {
        let user_id = Uuid::new_v4();
        let mut deps = TestDeps::new();
        deps.users
            .expect_find()
            .returning(|id| Ok(Some(user_row(id, "free"))));
        deps.payments.expect_create_portal_session().never();

        let (status, body) = send(
            deps,
            authed(
                Method::POST,
                "/api/v1/billing/portal",
                user_id,
                Some(json!({"userId": user_id})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_object());
    }
}
