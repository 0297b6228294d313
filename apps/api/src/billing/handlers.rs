//! Axum route handlers for checkout, the billing portal and processor webhooks.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{AuthUser, Session};
use crate::billing::reconciler::{SubscriptionReconciler, WebhookError};
use crate::billing::signature::SignatureError;
use crate::billing::stripe::CheckoutRequest;
use crate::errors::AppError;
use crate::state::AppState;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";
const LEMONSQUEEZY_SIGNATURE_HEADER: &str = "x-signature";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub price_id: String,
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalBody {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub url: String,
}

/// Billing actions may only be taken on the caller's own account.
fn ensure_owner(session: &Session, user_id: Uuid) -> Result<(), AppError> {
    if session.user_id != user_id {
        warn!(caller = %session.user_id, target = %user_id, "billing: cross-account request");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Checkout and portal
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/billing/checkout
pub async fn handle_checkout(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutResponse>, AppError> {
    ensure_owner(&session, body.user_id)?;
    if body.price_id.trim().is_empty() {
        return Err(AppError::Validation("priceId is required".to_string()));
    }
    if body.email.trim().is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }

    let user = state
        .users
        .find(body.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", body.user_id)))?;

    let request = CheckoutRequest {
        price_id: body.price_id.trim().to_string(),
        user_id: body.user_id,
        email: body.email.trim().to_string(),
        customer_id: user.stripe_customer_id,
    };
    let session_id = state.payments.create_checkout_session(&request).await?;

    Ok(Json(CheckoutResponse { session_id }))
}

/// POST /api/v1/billing/portal
pub async fn handle_portal(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(body): Json<PortalBody>,
) -> Result<Json<PortalResponse>, AppError> {
    ensure_owner(&session, body.user_id)?;

    let user = state
        .users
        .find(body.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", body.user_id)))?;
    let customer_id = user.stripe_customer_id.ok_or_else(|| {
        AppError::Validation("No billing account found for this user".to_string())
    })?;

    let url = state.payments.create_portal_session(&customer_id).await?;
    Ok(Json(PortalResponse { url }))
}

// ────────────────────────────────────────────────────────────────────────────
// Webhooks
// ────────────────────────────────────────────────────────────────────────────

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let code = match &self {
            WebhookError::Signature(SignatureError::Missing) => "MISSING_SIGNATURE",
            WebhookError::Signature(_) => "INVALID_SIGNATURE",
            WebhookError::Event(_) => "INVALID_EVENT",
            WebhookError::UnknownCustomer(_) => "UNKNOWN_CUSTOMER",
            WebhookError::Store(_) => "UPDATE_FAILED",
        };
        warn!(code, "billing: webhook rejected: {self}");

        // Always 400: the processor redelivers until it gets a 2xx.
        let message = match &self {
            WebhookError::Store(_) => "subscription update failed".to_string(),
            other => other.to_string(),
        };
        let body = json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn received() -> Response {
    (StatusCode::OK, Json(json!({ "received": true }))).into_response()
}

/// POST /api/webhooks/stripe
pub async fn handle_stripe_webhook(
    State(reconciler): State<Arc<SubscriptionReconciler>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError> {
    reconciler
        .handle_stripe(header(&headers, STRIPE_SIGNATURE_HEADER), &body)
        .await?;
    Ok(received())
}

/// POST /api/webhooks/lemonsqueezy
pub async fn handle_lemonsqueezy_webhook(
    State(reconciler): State<Arc<SubscriptionReconciler>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError> {
    reconciler
        .handle_lemonsqueezy(header(&headers, LEMONSQUEEZY_SIGNATURE_HEADER), &body)
        .await?;
    Ok(received())
}
