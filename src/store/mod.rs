// ============================================================================
// Persistent Collaborators
// ============================================================================
//
// Traits the domain depends on, plus their PostgreSQL implementations:
// - ProductCatalog   : authoritative product/category reads and search
// - OrderStore       : atomic Order + OrderDetail write, history reads
// - IdempotencyGuard : token existence check and record
//
// Every implementation is injected as `Arc<dyn Trait>`; nothing here is
// process-global.
//
// ============================================================================

mod catalog;
mod errors;
mod idempotency;
mod orders;

use async_trait::async_trait;

use crate::domain::checkout::{NewOrder, NewOrderDetail, OrderHistory, OrderId, OrderStatus, UserId};
use crate::domain::product::{CategoryId, Product, ProductCategory, ProductId, ProductSearch};

pub use catalog::PgProductCatalog;
pub use errors::StorageError;
pub use idempotency::PgIdempotencyGuard;
pub use orders::PgOrderStore;

/// Read access to the product catalog. `Ok(None)` means the row does not exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StorageError>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<ProductCategory>, StorageError>;

    /// One page of matching products and the total number of matches.
    async fn search_products(
        &self,
        search: &ProductSearch,
    ) -> Result<(Vec<Product>, i64), StorageError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the detail, link it, insert the order. All or nothing.
    async fn save_order_and_detail(
        &self,
        order: &NewOrder,
        detail: &NewOrderDetail,
    ) -> Result<OrderId, StorageError>;

    async fn order_history(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderHistory>, StorageError>;
}

/// Outcome of recording an idempotency token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    AlreadyRecorded,
}

/// Advisory duplicate-submission check. `exists` and `record` are separate
/// calls; nothing here makes the pair atomic.
#[async_trait]
pub trait IdempotencyGuard: Send + Sync {
    async fn exists(&self, token: &str) -> Result<bool, StorageError>;

    async fn record(&self, token: &str) -> Result<RecordOutcome, StorageError>;
}
