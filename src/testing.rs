// ============================================================================
// In-memory collaborators for unit tests
// ============================================================================

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::Instant;

use crate::cache::{CacheError, CacheStore};
use crate::domain::checkout::{
    CheckoutItem, NewOrder, NewOrderDetail, OrderCreatedEvent, OrderHistory, OrderId,
    OrderStatus, StatusHistoryEntry, UserId,
};
use crate::domain::product::{
    CategoryId, Product, ProductCategory, ProductId, ProductOrder, ProductSearch, SortDirection,
};
use crate::messaging::{EventPublisher, PublishError};
use crate::store::{IdempotencyGuard, OrderStore, ProductCatalog, RecordOutcome, StorageError};

pub fn product(id: ProductId, price: Decimal, stock: i64) -> Product {
    Product {
        id,
        name: format!("product-{id}"),
        description: String::new(),
        price,
        stock,
        category_id: 1,
    }
}

fn offline_db() -> StorageError {
    StorageError::Database(sqlx::Error::PoolTimedOut)
}

fn offline_cache() -> CacheError {
    CacheError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "cache offline",
    )))
}

// ----------------------------------------------------------------------------
// Catalog
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryCatalog {
    products: Mutex<HashMap<ProductId, Product>>,
    categories: Mutex<HashMap<CategoryId, ProductCategory>>,
    reads: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id, product);
    }

    pub fn insert_category(&self, category: ProductCategory) {
        self.categories.lock().unwrap().insert(category.id, category);
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(offline_db());
        }
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StorageError> {
        self.check()?;
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<ProductCategory>, StorageError> {
        self.check()?;
        Ok(self.categories.lock().unwrap().get(&id).cloned())
    }

    async fn search_products(
        &self,
        search: &ProductSearch,
    ) -> Result<(Vec<Product>, i64), StorageError> {
        self.check()?;
        let categories = self.categories.lock().unwrap();
        let mut found: Vec<Product> = self
            .products
            .lock()
            .unwrap()
            .values()
            .filter(|p| {
                let category = categories.get(&p.category_id).map(|c| c.name.as_str());
                // the catalog join drops products whose category is missing
                category.is_some() && search.matches(p, category)
            })
            .cloned()
            .collect();

        found.sort_by(|a, b| {
            let ordering = match search.order_by {
                ProductOrder::Name => a.name.cmp(&b.name),
                ProductOrder::Price => a.price.cmp(&b.price),
                ProductOrder::Stock => a.stock.cmp(&b.stock),
                ProductOrder::Id => a.id.cmp(&b.id),
            };
            let ordering = match search.sort {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            ordering.then(a.id.cmp(&b.id))
        });

        let total = found.len() as i64;
        let page = found
            .into_iter()
            .skip(search.offset() as usize)
            .take(search.limit() as usize)
            .collect();
        Ok((page, total))
    }
}

// ----------------------------------------------------------------------------
// Cache store
// ----------------------------------------------------------------------------

struct Entry {
    value: String,
    ttl: Duration,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
    write_delay: Option<Duration>,
    failing_reads: AtomicBool,
    failing_writes: AtomicBool,
    failed_writes_left: AtomicUsize,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn fail_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    /// Fail only the next `count` writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.failed_writes_left.store(count, Ordering::SeqCst);
    }

    pub fn seed<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = serde_json::to_string(value).unwrap();
        self.insert(key, value, ttl);
    }

    /// Present and not yet expired.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).map(|entry| entry.ttl)
    }

    fn insert(&self, key: &str, value: String, ttl: Duration) {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value,
                ttl,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(offline_cache());
        }

        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        let transient = self
            .failed_writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if transient || self.failing_writes.load(Ordering::SeqCst) {
            return Err(offline_cache());
        }
        self.insert(key, value.to_string(), ttl);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Order store
// ----------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct StoredOrder {
    pub id: OrderId,
    pub order: NewOrder,
    pub detail: NewOrderDetail,
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<Vec<StoredOrder>>,
    next_id: AtomicI64,
    failing: AtomicBool,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn orders(&self) -> Vec<StoredOrder> {
        self.orders.lock().unwrap().clone()
    }

    /// Write an order directly, bypassing checkout.
    pub fn insert_with_status(&self, user_id: UserId, status: OrderStatus) -> OrderId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let order = NewOrder {
            user_id,
            amount: Decimal::ONE,
            total_qty: 1,
            status,
            payment_method: "card".to_string(),
            shipping_address: "somewhere".to_string(),
        };
        let detail = NewOrderDetail::for_checkout(&[], chrono::Utc::now()).unwrap();
        self.orders.lock().unwrap().push(StoredOrder { id, order, detail });
        id
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save_order_and_detail(
        &self,
        order: &NewOrder,
        detail: &NewOrderDetail,
    ) -> Result<OrderId, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(offline_db());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.orders.lock().unwrap().push(StoredOrder {
            id,
            order: order.clone(),
            detail: detail.clone(),
        });
        Ok(id)
    }

    async fn order_history(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderHistory>, StorageError> {
        let orders = self.orders.lock().unwrap().clone();

        let mut history = orders
            .into_iter()
            .filter(|stored| stored.order.user_id == user_id)
            .filter(|stored| status.is_none_or(|status| stored.order.status == status))
            .map(|stored| -> Result<OrderHistory, StorageError> {
                let products: Vec<CheckoutItem> = serde_json::from_str(&stored.detail.products)?;
                let history: Vec<StatusHistoryEntry> =
                    serde_json::from_str(&stored.detail.order_history)?;
                Ok(OrderHistory {
                    order_id: stored.id,
                    total_amount: stored.order.amount,
                    total_qty: stored.order.total_qty,
                    status: stored.order.status,
                    payment_method: stored.order.payment_method,
                    shipping_address: stored.order.shipping_address,
                    products,
                    history,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        history.sort_by(|a, b| b.order_id.cmp(&a.order_id));
        Ok(history)
    }
}

// ----------------------------------------------------------------------------
// Idempotency guard
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryIdempotencyGuard {
    tokens: Mutex<HashSet<String>>,
    failing_exists: AtomicBool,
    failing_record: AtomicBool,
}

impl InMemoryIdempotencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_exists(&self, failing: bool) {
        self.failing_exists.store(failing, Ordering::SeqCst);
    }

    pub fn fail_record(&self, failing: bool) {
        self.failing_record.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.lock().unwrap().contains(token)
    }

    pub fn preload(&self, token: &str) {
        self.tokens.lock().unwrap().insert(token.to_string());
    }
}

#[async_trait]
impl IdempotencyGuard for InMemoryIdempotencyGuard {
    async fn exists(&self, token: &str) -> Result<bool, StorageError> {
        if self.failing_exists.load(Ordering::SeqCst) {
            return Err(offline_db());
        }
        Ok(self.contains(token))
    }

    async fn record(&self, token: &str) -> Result<RecordOutcome, StorageError> {
        if self.failing_record.load(Ordering::SeqCst) {
            return Err(offline_db());
        }
        if self.tokens.lock().unwrap().insert(token.to_string()) {
            Ok(RecordOutcome::Recorded)
        } else {
            Ok(RecordOutcome::AlreadyRecorded)
        }
    }
}

// ----------------------------------------------------------------------------
// Publisher
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<OrderCreatedEvent>>,
    rejecting: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<OrderCreatedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &OrderCreatedEvent) -> Result<(), PublishError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(PublishError::Rejected("broker unavailable".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
