use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_checkout::cache::{CacheSettings, ProductCache, RedisCacheStore};
use order_checkout::config::{Command, Config};
use order_checkout::domain::checkout::{
    CheckoutOrchestrator, CheckoutRequest, InventoryValidator, OrderHistoryService,
};
use order_checkout::domain::product::ProductService;
use order_checkout::messaging::RedpandaPublisher;
use order_checkout::metrics::{self, Metrics};
use order_checkout::store::{PgIdempotencyGuard, PgOrderStore, PgProductCatalog};

const SCHEMA: &str = include_str!("../migrations/schema.sql");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_checkout=debug")),
        )
        .init();

    let config = Config::parse();

    tracing::info!("🚀 Starting order checkout");

    // === 1. PostgreSQL ===
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    sqlx::raw_sql(SCHEMA)
        .execute(&pool)
        .await
        .context("failed to apply schema")?;
    tracing::info!("✅ Database schema ready");

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let registry = metrics.registry().clone();
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start metrics runtime");
                return;
            }
        };
        rt.block_on(async {
            if let Err(e) = metrics::start_metrics_server(registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 3. Cache, broker and stores ===
    let cache_store = Arc::new(
        RedisCacheStore::connect(&config.redis_url)
            .await
            .context("failed to connect to Redis")?,
    );
    let catalog = Arc::new(PgProductCatalog::new(pool.clone()));
    let orders = Arc::new(PgOrderStore::new(pool.clone()));
    let idempotency = Arc::new(PgIdempotencyGuard::new(pool.clone()));

    let product_cache = Arc::new(ProductCache::new(
        cache_store,
        catalog.clone(),
        metrics.clone(),
        CacheSettings::default(),
    ));

    // === 4. Run the requested operation ===
    let output = match &config.command {
        Command::Checkout { file } => {
            let raw = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let request: CheckoutRequest =
                serde_json::from_str(&raw).context("invalid checkout request")?;

            let publisher = Arc::new(RedpandaPublisher::new(
                &config.kafka_brokers,
                config.order_created_topic.clone(),
                config.publish_timeout(),
                metrics.clone(),
            )?);

            let mut orchestrator = CheckoutOrchestrator::new(
                idempotency,
                InventoryValidator::new(product_cache.clone()),
                orders,
                publisher,
                metrics.clone(),
            );
            if let Some(limit) = config.step_timeout() {
                orchestrator = orchestrator.with_step_timeout(limit);
            }

            match orchestrator.checkout(&request).await {
                Ok(order_id) => serde_json::json!({ "order_id": order_id }),
                Err(e) => serde_json::json!({
                    "error": {
                        "kind": e.kind().as_str(),
                        "message": e.to_string(),
                        "committed_order_id": e.committed_order(),
                    }
                }),
            }
        }
        Command::Product { id } => {
            let service = ProductService::new(product_cache.clone(), catalog.clone());
            serde_json::to_value(service.get_product(*id).await?)?
        }
        Command::Category { id } => {
            let service = ProductService::new(product_cache.clone(), catalog.clone());
            serde_json::to_value(service.get_category(*id).await?)?
        }
        Command::Search(args) => {
            let service = ProductService::new(product_cache.clone(), catalog.clone());
            serde_json::to_value(service.search(&args.to_search()).await?)?
        }
        Command::History { user_id, status } => {
            let service = OrderHistoryService::new(orders);
            serde_json::to_value(service.order_history(*user_id, *status).await?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    // Let detached cache writes finish before exit
    product_cache.drain().await;
    pool.close().await;

    tracing::info!("👋 Shutdown complete");
    Ok(())
}
