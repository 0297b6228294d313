//! Provider webhook payloads mapped onto subscription updates.
//!
//! Parsing is pure: it turns a verified body into at most one
//! [`SubscriptionUpdate`]. Looking up and writing the user happens in
//! [`super::reconciler`].

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::quota::SubscriptionStatus;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid event payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event is missing {0}")]
    MissingField(&'static str),

    #[error("invalid user id '{0}'")]
    InvalidUserId(String),
}

/// A processor-side customer identifier, tagged by processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerId {
    Stripe(String),
    LemonSqueezy(String),
}

impl CustomerId {
    /// Column on the `users` table holding this kind of id.
    pub fn column(&self) -> &'static str {
        match self {
            CustomerId::Stripe(_) => "stripe_customer_id",
            CustomerId::LemonSqueezy(_) => "lemonsqueezy_customer_id",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            CustomerId::Stripe(id) | CustomerId::LemonSqueezy(id) => id,
        }
    }
}

/// One status write on one user. The user is named directly when the event
/// carries our id, otherwise found through the stored customer id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub user_id: Option<Uuid>,
    pub customer: Option<CustomerId>,
    pub status: SubscriptionStatus,
    /// Whether `customer` should be persisted alongside the status.
    pub store_customer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    Update(SubscriptionUpdate),
    Ignore { event: String },
}

/// Maps a processor subscription status onto a tier. `None` for statuses with
/// no tier meaning.
pub fn map_status(status: &str) -> Option<SubscriptionStatus> {
    match status {
        "active" | "trialing" | "on_trial" => Some(SubscriptionStatus::Active),
        "canceled" | "cancelled" | "expired" | "unpaid" => Some(SubscriptionStatus::Canceled),
        "incomplete" | "incomplete_expired" | "past_due" | "paused" => {
            Some(SubscriptionStatus::Incomplete)
        }
        _ => None,
    }
}

fn parse_user_id(raw: &str) -> Result<Uuid, EventError> {
    raw.trim()
        .parse()
        .map_err(|_| EventError::InvalidUserId(raw.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Stripe
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    client_reference_id: Option<String>,
    metadata: Option<StripeMetadata>,
    customer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeMetadata {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    customer: Option<String>,
    #[serde(default)]
    status: String,
}

pub fn parse_stripe_event(body: &[u8]) -> Result<WebhookAction, EventError> {
    let event: StripeEvent = serde_json::from_slice(body)?;

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSession = serde_json::from_value(event.data.object)?;
            let raw_user = session
                .client_reference_id
                .or(session.metadata.and_then(|m| m.user_id))
                .ok_or(EventError::MissingField("client_reference_id"))?;
            Ok(WebhookAction::Update(SubscriptionUpdate {
                user_id: Some(parse_user_id(&raw_user)?),
                store_customer: session.customer.is_some(),
                customer: session.customer.map(CustomerId::Stripe),
                status: SubscriptionStatus::Active,
            }))
        }
        "customer.subscription.created" | "customer.subscription.updated" => {
            let sub: StripeSubscription = serde_json::from_value(event.data.object)?;
            let customer = sub.customer.ok_or(EventError::MissingField("customer"))?;
            match map_status(&sub.status) {
                Some(status) => Ok(WebhookAction::Update(SubscriptionUpdate {
                    user_id: None,
                    customer: Some(CustomerId::Stripe(customer)),
                    status,
                    store_customer: false,
                })),
                None => Ok(WebhookAction::Ignore {
                    event: format!("{} ({})", event.event_type, sub.status),
                }),
            }
        }
        "customer.subscription.deleted" => {
            let sub: StripeSubscription = serde_json::from_value(event.data.object)?;
            let customer = sub.customer.ok_or(EventError::MissingField("customer"))?;
            Ok(WebhookAction::Update(SubscriptionUpdate {
                user_id: None,
                customer: Some(CustomerId::Stripe(customer)),
                status: SubscriptionStatus::Canceled,
                store_customer: false,
            }))
        }
        _ => Ok(WebhookAction::Ignore {
            event: event.event_type,
        }),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lemon Squeezy
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LemonEvent {
    meta: LemonMeta,
    #[serde(default)]
    data: LemonData,
}

#[derive(Debug, Deserialize)]
struct LemonMeta {
    event_name: String,
    #[serde(default)]
    custom_data: Option<LemonCustomData>,
}

#[derive(Debug, Deserialize)]
struct LemonCustomData {
    user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LemonData {
    #[serde(default)]
    attributes: LemonAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct LemonAttributes {
    #[serde(default)]
    status: String,
    /// Numeric in practice; accepted as a string too.
    #[serde(default)]
    customer_id: Value,
}

impl LemonAttributes {
    fn customer(&self) -> Option<CustomerId> {
        let id = match &self.customer_id {
            Value::Number(n) => n.to_string(),
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return None,
        };
        Some(CustomerId::LemonSqueezy(id))
    }
}

pub fn parse_lemonsqueezy_event(body: &[u8]) -> Result<WebhookAction, EventError> {
    let event: LemonEvent = serde_json::from_slice(body)?;
    let attributes = &event.data.attributes;
    let user_id = event
        .meta
        .custom_data
        .as_ref()
        .and_then(|c| c.user_id.as_deref())
        .map(parse_user_id)
        .transpose()?;
    let customer = attributes.customer();

    let event_name = event.meta.event_name.as_str();
    let status = match event_name {
        "subscription_created" => {
            if user_id.is_none() {
                return Err(EventError::MissingField("meta.custom_data.user_id"));
            }
            map_status(&attributes.status)
        }
        "subscription_updated" | "subscription_resumed" => map_status(&attributes.status),
        "subscription_cancelled" | "subscription_expired" => Some(SubscriptionStatus::Canceled),
        _ => {
            return Ok(WebhookAction::Ignore {
                event: event_name.to_string(),
            })
        }
    };

    let Some(status) = status else {
        return Ok(WebhookAction::Ignore {
            event: format!("{event_name} ({})", attributes.status),
        });
    };
    if user_id.is_none() && customer.is_none() {
        return Err(EventError::MissingField("customer_id"));
    }

    Ok(WebhookAction::Update(SubscriptionUpdate {
        user_id,
        store_customer: event_name == "subscription_created" && customer.is_some(),
        customer,
        status,
    }))
}
