//! Billing: Stripe checkout and portal sessions, plus the webhook reconciler
//! that keeps `users.subscription_status` in step with the payment processors.

pub mod events;
pub mod handlers;
pub mod reconciler;
pub mod signature;
pub mod stripe;
