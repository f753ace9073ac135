//! GenPay Server
//!
//! Payment gateway and logistics integration for a WooCommerce shop: hosts
//! the gateway webhook, the billet download and a signed service API.

mod api;
mod config;
mod notifier;
mod server;
mod shutdown;
mod state;
mod woocommerce;

use clap::Parser;
use config::{ConfigLoader, database_url};
use genpay_core::backend::{Notifier, OrderBackend};
use genpay_core::gateway::{Gateway, Logistics};
use genpay_core::processors::{Orchestrator, ShipmentDispatcher, WebhookHandler};
use genpay_core::store::{MemoryTransactionStore, PgTransactionStore, TransactionStore};
use genpay_sdk::client::{GatewayClient, LogisticsClient};
use notifier::ShopNotifier;
use server::{build_router, run_server};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use woocommerce::WooCommerceBackend;

/// GenPay Server - payment gateway integration for WooCommerce
#[derive(Parser, Debug)]
#[command(name = "genpay-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./genpay-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting genpay-server v{}", env!("CARGO_PKG_VERSION"));

    let loaded_config = ConfigLoader::new(&args.config, args.listen)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);
    let listen_addr = loaded_config.listen;

    // Transaction store: PostgreSQL when DATABASE_URL is set
    let (store, db_pool): (Arc<dyn TransactionStore>, _) = match database_url() {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to database: {}", e);
                    e
                })?;
            tracing::info!("Database connection established");

            if args.migrate {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("../migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to run migrations: {}", e);
                        e
                    })?;
                tracing::info!("Migrations completed successfully");
            }
            (
                Arc::new(PgTransactionStore::new(pool.clone())) as Arc<dyn TransactionStore>,
                Some(pool),
            )
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, transaction records are kept in memory and lost on restart"
            );
            (
                Arc::new(MemoryTransactionStore::new()) as Arc<dyn TransactionStore>,
                None,
            )
        }
    };

    let gateway_client = GatewayClient::new(&loaded_config.gateway)?;
    match gateway_client.check_credentials().await {
        Ok(status) if status.is_success() => tracing::info!("Gateway credentials accepted"),
        Ok(status) => tracing::warn!(%status, "Gateway rejected the configured credentials"),
        Err(e) => tracing::warn!(error = %e, "Gateway credential check failed"),
    }
    let gateway: Arc<dyn Gateway> = Arc::new(gateway_client);

    let service_secret: Arc<[u8]> = Arc::from(loaded_config.service_secret);
    let shop = Arc::new(WooCommerceBackend::new(&loaded_config.shop)?);
    let backend: Arc<dyn OrderBackend> = shop.clone();
    let notifier: Arc<dyn Notifier> = Arc::new(ShopNotifier::new(
        shop,
        loaded_config.merchant_notification_url,
        service_secret.clone(),
    )?);

    let orchestrator = Orchestrator::new(
        gateway.clone(),
        store.clone(),
        backend.clone(),
        notifier.clone(),
        Arc::new(loaded_config.checkout),
    );
    let webhooks = WebhookHandler::new(
        gateway,
        store,
        backend.clone(),
        orchestrator.status_machine().clone(),
    );

    let shipping = match &loaded_config.logistics {
        Some(logistics_config) => {
            let logistics: Arc<dyn Logistics> = Arc::new(LogisticsClient::new(logistics_config)?);
            tracing::info!("Logistics partner enabled");
            Some(ShipmentDispatcher::new(logistics, backend, notifier))
        }
        None => {
            tracing::info!("No [logistics] section, shipping endpoints disabled");
            None
        }
    };

    let state = AppState::new(orchestrator, webhooks, shipping, service_secret);
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    if let Some(pool) = db_pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
