//! Subscription reconciler: verified provider events → `users.subscription_status`.
//!
//! Every failure surfaces as [`WebhookError`] and is answered with 400 so the
//! processor redelivers. Writes are plain "set status" updates, so replays are
//! harmless.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::billing::events::{
    parse_lemonsqueezy_event, parse_stripe_event, CustomerId, EventError, SubscriptionUpdate,
    WebhookAction,
};
use crate::billing::signature::{verify_hex_signature, verify_stripe_signature, SignatureError};
use crate::errors::AppError;
use crate::quota::SubscriptionStatus;
use crate::users::store::PgUserStore;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("no user with {} {}", .0.column(), .0.value())]
    UnknownCustomer(CustomerId),

    #[error("subscriber store: {0}")]
    Store(#[from] AppError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Updated {
        user_id: Uuid,
        status: SubscriptionStatus,
    },
    Ignored,
}

/// Billing-side access to the `users` table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn find_user_by_customer(&self, customer: &CustomerId) -> Result<Option<Uuid>, AppError>;

    /// Sets the tier, and the customer id when given. Errors if the user does not exist.
    async fn set_subscription(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
        customer: Option<CustomerId>,
    ) -> Result<(), AppError>;
}

#[async_trait]
impl SubscriberStore for PgUserStore {
    async fn find_user_by_customer(&self, customer: &CustomerId) -> Result<Option<Uuid>, AppError> {
        let sql = format!("SELECT id FROM users WHERE {} = $1 LIMIT 1", customer.column());
        let id: Option<(Uuid,)> = sqlx::query_as(&sql)
            .bind(customer.value())
            .fetch_optional(self.pool())
            .await?;
        Ok(id.map(|(id,)| id))
    }

    async fn set_subscription(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
        customer: Option<CustomerId>,
    ) -> Result<(), AppError> {
        let result = match &customer {
            Some(customer) => {
                let sql = format!(
                    "UPDATE users SET subscription_status = $2, {} = $3, updated_at = now() WHERE id = $1",
                    customer.column()
                );
                sqlx::query(&sql)
                    .bind(user_id)
                    .bind(status.as_str())
                    .bind(customer.value())
                    .execute(self.pool())
                    .await?
            }
            None => {
                sqlx::query(
                    "UPDATE users SET subscription_status = $2, updated_at = now() WHERE id = $1",
                )
                .bind(user_id)
                .bind(status.as_str())
                .execute(self.pool())
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }
}

pub struct SubscriptionReconciler {
    store: Arc<dyn SubscriberStore>,
    stripe_secret: String,
    lemonsqueezy_secret: String,
}

impl SubscriptionReconciler {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        stripe_secret: String,
        lemonsqueezy_secret: String,
    ) -> Self {
        Self {
            store,
            stripe_secret,
            lemonsqueezy_secret,
        }
    }

    pub async fn handle_stripe(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<ReconcileOutcome, WebhookError> {
        verify_stripe_signature(&self.stripe_secret, body, signature)?;
        let action = parse_stripe_event(body)?;
        self.apply("stripe", action).await
    }

    pub async fn handle_lemonsqueezy(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<ReconcileOutcome, WebhookError> {
        verify_hex_signature(&self.lemonsqueezy_secret, body, signature)?;
        let action = parse_lemonsqueezy_event(body)?;
        self.apply("lemonsqueezy", action).await
    }

    async fn apply(
        &self,
        provider: &'static str,
        action: WebhookAction,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let update = match action {
            WebhookAction::Update(update) => update,
            WebhookAction::Ignore { event } => {
                info!(provider, %event, "billing: event ignored");
                return Ok(ReconcileOutcome::Ignored);
            }
        };

        let user_id = self.resolve_user(&update).await?;
        let SubscriptionUpdate {
            status,
            customer,
            store_customer,
            ..
        } = update;
        let customer = customer.filter(|_| store_customer);

        self.store
            .set_subscription(user_id, status, customer)
            .await?;

        info!(provider, %user_id, %status, "billing: subscription updated");
        Ok(ReconcileOutcome::Updated { user_id, status })
    }

    async fn resolve_user(&self, update: &SubscriptionUpdate) -> Result<Uuid, WebhookError> {
        if let Some(user_id) = update.user_id {
            return Ok(user_id);
        }
        let customer = update
            .customer
            .clone()
            .ok_or(EventError::MissingField("customer"))?;
        match self.store.find_user_by_customer(&customer).await? {
            Some(user_id) => Ok(user_id),
            None => {
                warn!(customer = customer.value(), "billing: no user for customer");
                Err(WebhookError::UnknownCustomer(customer))
            }
        }
    }
}
