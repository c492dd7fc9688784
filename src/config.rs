use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use crate::domain::checkout::{OrderStatus, UserId};
use crate::domain::product::{CategoryId, ProductId, ProductOrder, ProductSearch, SortDirection};

// ============================================================================
// Configuration
// ============================================================================
//
// Every connection setting can come from a flag or from the environment.
//
// ============================================================================

#[derive(Parser, Debug, Clone)]
#[command(name = "order_checkout", version, about = "Order checkout core")]
pub struct Config {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Comma-separated Kafka/Redpanda bootstrap servers
    #[arg(long, env = "KAFKA_BROKERS", default_value = "127.0.0.1:9092")]
    pub kafka_brokers: String,

    #[arg(long, env = "ORDER_CREATED_TOPIC", default_value = "order.created")]
    pub order_created_topic: String,

    /// How long the broker may take to acknowledge a message
    #[arg(long, env = "PUBLISH_TIMEOUT_MS", default_value_t = 5000)]
    pub publish_timeout_ms: u64,

    /// Upper bound for each storage step of a checkout; 0 disables it
    #[arg(long, env = "STEP_TIMEOUT_MS", default_value_t = 0)]
    pub step_timeout_ms: u64,

    #[arg(long, env = "METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Place an order from a JSON checkout request file
    Checkout { file: PathBuf },

    /// Look up one product
    Product { id: ProductId },

    /// Look up one product category
    Category { id: CategoryId },

    /// Search the catalog, one page at a time
    Search(SearchArgs),

    /// List a user's orders, newest first
    History {
        user_id: UserId,

        #[arg(long)]
        status: Option<OrderStatus>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Case-insensitive part of the product name
    #[arg(long)]
    pub name: Option<String>,

    /// Exact category name
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub min_price: Option<Decimal>,

    #[arg(long)]
    pub max_price: Option<Decimal>,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 10)]
    pub page_size: u32,

    /// name, price, stock or id; anything else sorts by name
    #[arg(long, default_value = "name")]
    pub order_by: String,

    /// ASC or DESC
    #[arg(long, default_value = "ASC")]
    pub sort: String,
}

impl SearchArgs {
    pub fn to_search(&self) -> ProductSearch {
        ProductSearch {
            name: self.name.clone(),
            category: self.category.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            page: self.page,
            page_size: self.page_size,
            order_by: ProductOrder::from_param(&self.order_by),
            sort: SortDirection::from_param(&self.sort),
        }
    }
}

impl Config {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        (self.step_timeout_ms > 0).then(|| Duration::from_millis(self.step_timeout_ms))
    }
}
