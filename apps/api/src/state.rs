use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::SessionVerifier;
use crate::billing::reconciler::SubscriptionReconciler;
use crate::billing::stripe::PaymentGateway;
use crate::blog::store::BlogStore;
use crate::config::Config;
use crate::generation::flows::GenerationBackend;
use crate::jobs::store::JobStore;
use crate::quota::gate::QuotaGate;
use crate::users::store::UserStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Storage and outbound services sit behind traits so tests can swap them.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionVerifier,
    pub quota: QuotaGate,
    pub users: Arc<dyn UserStore>,
    pub jobs: Arc<dyn JobStore>,
    pub blog: Arc<dyn BlogStore>,
    pub flows: Arc<dyn GenerationBackend>,
    pub payments: Arc<dyn PaymentGateway>,
    /// Webhook handlers extract this directly.
    pub reconciler: Arc<SubscriptionReconciler>,
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::auth::testing::{token_for, SECRET};
    use crate::billing::reconciler::MockSubscriberStore;
    use crate::billing::stripe::MockPaymentGateway;
    use crate::blog::store::MockBlogStore;
    use crate::generation::flows::MockGenerationBackend;
    use crate::jobs::store::MockJobStore;
    use crate::quota::ledger::memory::MemoryLedger;
    use crate::users::store::MockUserStore;

    pub const ADMIN_EMAIL: &str = "editor@example.com";
    pub const USER_EMAIL: &str = "ada@example.com";

    pub fn config() -> Config {
        Config {
            database_url: "postgres://localhost/jobpilot_test".to_string(),
            auth_jwt_secret: SECRET.to_string(),
            anthropic_api_key: "test-key".to_string(),
            llm_model: "test-model".to_string(),
            stripe_secret_key: "sk_test".to_string(),
            stripe_webhook_secret: "whsec_test".to_string(),
            lemonsqueezy_webhook_secret: "lemon_test".to_string(),
            app_url: "http://localhost:3000".to_string(),
            admin_emails: vec![ADMIN_EMAIL.to_string()],
            port: 8080,
            rust_log: "debug".to_string(),
        }
    }

    /// `Authorization` header value for a regular user valid for an hour.
    pub fn bearer(user_id: Uuid) -> String {
        let exp = (Utc::now().timestamp() + 3600) as usize;
        format!(
            "Bearer {}",
            token_for(&user_id.to_string(), Some(USER_EMAIL), exp, SECRET)
        )
    }

    /// Mocks for every seam. Set expectations, then call [`TestDeps::into_state`].
    pub struct TestDeps {
        pub users: MockUserStore,
        pub jobs: MockJobStore,
        pub blog: MockBlogStore,
        pub flows: MockGenerationBackend,
        pub payments: MockPaymentGateway,
        pub subscribers: MockSubscriberStore,
        pub ledger: Arc<MemoryLedger>,
    }

    impl TestDeps {
        pub fn new() -> Self {
            Self {
                users: MockUserStore::new(),
                jobs: MockJobStore::new(),
                blog: MockBlogStore::new(),
                flows: MockGenerationBackend::new(),
                payments: MockPaymentGateway::new(),
                subscribers: MockSubscriberStore::new(),
                ledger: Arc::new(MemoryLedger::default()),
            }
        }

        pub fn into_state(self) -> AppState {
            let config = config();
            AppState {
                sessions: SessionVerifier::new(&config.auth_jwt_secret),
                quota: QuotaGate::new(self.ledger),
                users: Arc::new(self.users),
                jobs: Arc::new(self.jobs),
                blog: Arc::new(self.blog),
                flows: Arc::new(self.flows),
                payments: Arc::new(self.payments),
                reconciler: Arc::new(SubscriptionReconciler::new(
                    Arc::new(self.subscribers),
                    config.stripe_webhook_secret.clone(),
                    config.lemonsqueezy_webhook_secret.clone(),
                )),
                config: Arc::new(config),
            }
        }
    }
}
