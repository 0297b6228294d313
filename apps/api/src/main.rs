mod auth;
mod billing;
mod blog;
mod config;
mod db;
mod errors;
mod generation;
mod jobs;
mod llm_client;
mod models;
mod quota;
mod routes;
mod state;
mod users;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::SessionVerifier;
use crate::billing::reconciler::SubscriptionReconciler;
use crate::billing::stripe::StripeClient;
use crate::blog::store::PgBlogStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::generation::flows::LlmFlows;
use crate::jobs::store::PgJobStore;
use crate::llm_client::LlmClient;
use crate::quota::gate::QuotaGate;
use crate::routes::build_router;
use crate::state::AppState;
use crate::users::store::PgUserStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobPilot API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // The users table backs profiles, the usage ledger and the webhook reconciler
    let user_store = Arc::new(PgUserStore::new(db.clone()));

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.llm_model.clone())?;
    info!("LLM client initialized (model: {})", llm.model());

    let payments = StripeClient::new(config.stripe_secret_key.clone(), config.app_url.clone())?;

    let reconciler = SubscriptionReconciler::new(
        user_store.clone(),
        config.stripe_webhook_secret.clone(),
        config.lemonsqueezy_webhook_secret.clone(),
    );

    if config.admin_emails.is_empty() {
        info!("ADMIN_EMAILS is empty; blog editing is disabled");
    }

    // Build app state
    let state = AppState {
        sessions: SessionVerifier::new(&config.auth_jwt_secret),
        quota: QuotaGate::new(user_store.clone()),
        users: user_store,
        jobs: Arc::new(PgJobStore::new(db.clone())),
        blog: Arc::new(PgBlogStore::new(db)),
        flows: Arc::new(LlmFlows::new(llm)),
        payments: Arc::new(payments),
        reconciler: Arc::new(reconciler),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to APP_URL once the web app has a fixed domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
