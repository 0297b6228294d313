//! Stripe API client for hosted checkout and the customer portal.

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// What the checkout page needs to open a subscription session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub user_id: Uuid,
    pub email: String,
    /// Reused when the user already has a Stripe customer.
    pub customer_id: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the checkout session id.
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<String, AppError>;

    /// Returns the portal URL for an existing customer.
    async fn create_portal_session(&self, customer_id: &str) -> Result<String, AppError>;
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PortalSessionResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    app_url: String,
}

impl StripeClient {
    pub fn new(secret_key: String, app_url: String) -> AnyResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build Stripe HTTP client")?;
        Ok(Self {
            client,
            secret_key,
            app_url: app_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .client
            .post(format!("{STRIPE_API_BASE}{path}"))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!(path, status = status.as_u16(), "stripe: request rejected: {message}");
            return Err(AppError::Payment(format!("{path} returned {status}: {message}")));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("unreadable response from {path}: {e}")))
    }
}

/// Form fields for a subscription checkout session.
pub fn checkout_form(request: &CheckoutRequest, app_url: &str) -> Vec<(&'static str, String)> {
    let user_id = request.user_id.to_string();
    let mut form = vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", request.price_id.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        (
            "success_url",
            format!("{app_url}/dashboard?checkout=success&session_id={{CHECKOUT_SESSION_ID}}"),
        ),
        ("cancel_url", format!("{app_url}/pricing?checkout=canceled")),
        ("client_reference_id", user_id.clone()),
        ("metadata[userId]", user_id.clone()),
        ("subscription_data[metadata][userId]", user_id),
    ];
    match &request.customer_id {
        Some(customer) => form.push(("customer", customer.clone())),
        None => form.push(("customer_email", request.email.clone())),
    }
    form
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<String, AppError> {
        let form = checkout_form(request, &self.app_url);
        let session: CheckoutSessionResponse = self.post_form("/checkout/sessions", &form).await?;
        info!(user_id = %request.user_id, session_id = %session.id, "stripe: checkout session created");
        Ok(session.id)
    }

    async fn create_portal_session(&self, customer_id: &str) -> Result<String, AppError> {
        let form = [
            ("customer", customer_id.to_string()),
            ("return_url", format!("{}/settings", self.app_url)),
        ];
        let session: PortalSessionResponse =
            self.post_form("/billing_portal/sessions", &form).await?;
        Ok(session.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(form: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    fn request(customer_id: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            price_id: "price_pro_monthly".to_string(),
            user_id: Uuid::nil(),
            email: "ada@example.com".to_string(),
            customer_id: customer_id.map(str::to_string),
        }
    }

    #[test]
    fn test_checkout_form_links_session_to_user() {
        let form = checkout_form(&request(None), "https://app.example.com");
        let user = Uuid::nil().to_string();
        assert_eq!(field(&form, "mode"), Some("subscription"));
        assert_eq!(field(&form, "line_items[0][price]"), Some("price_pro_monthly"));
        assert_eq!(field(&form, "client_reference_id"), Some(user.as_str()));
        assert_eq!(field(&form, "metadata[userId]"), Some(user.as_str()));
        assert_eq!(field(&form, "customer_email"), Some("ada@example.com"));
        assert_eq!(field(&form, "customer"), None);
        assert!(field(&form, "success_url")
            .unwrap()
            .starts_with("https://app.example.com/dashboard"));
    }

    #[test]
    fn test_checkout_form_reuses_existing_customer() {
        let form = checkout_form(&request(Some("cus_1")), "https://app.example.com");
        assert_eq!(field(&form, "customer"), Some("cus_1"));
        assert_eq!(field(&form, "customer_email"), None);
    }
}
