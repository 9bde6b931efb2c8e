//! vendor-billing server entry point.
//!
//! Startup order: configuration, tracing, database pool, migrations,
//! ledger reconciliation, then the HTTP listener.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vendor_billing::adapters::http::{billing_router, BillingAppState};
use vendor_billing::adapters::postgres::{
    PostgresIdempotencyStore, PostgresSubscriptionStore, PostgresVendorDirectory,
};
use vendor_billing::application::{HandlePaymentWebhookHandler, ReconcileLedgerHandler};
use vendor_billing::config::{AppConfig, ServerConfig};
use vendor_billing::domain::billing::{
    EventNormalizer, IdempotencyLedger, SubscriptionStateMachine, WebhookVerifier,
};
use vendor_billing::ports::SubscriptionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config.server);
    tracing::info!("Starting vendor-billing v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    tracing::info!("Database connection established");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations completed");
    }

    let subscriptions: Arc<dyn SubscriptionStore> =
        Arc::new(PostgresSubscriptionStore::new(pool.clone()));
    let ledger = Arc::new(IdempotencyLedger::new(
        Arc::new(PostgresIdempotencyStore::new(pool.clone())),
        config.payment.processing_timeout_secs,
    ));

    // Must finish before the first delivery is accepted
    ReconcileLedgerHandler::new(ledger.clone(), subscriptions.clone())
        .handle()
        .await?;

    let webhook_handler = HandlePaymentWebhookHandler::new(
        WebhookVerifier::new(config.payment.webhook_secret.clone()),
        EventNormalizer::new(Arc::new(PostgresVendorDirectory::new(pool.clone()))),
        ledger,
        SubscriptionStateMachine::new(subscriptions),
    );
    let state = BillingAppState::new(
        Arc::new(webhook_handler),
        config.payment.signature_header.as_str(),
    );

    let app = billing_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// JSON output in production, human-readable otherwise. `RUST_LOG` wins over
/// the configured filter when set.
fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if server.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
