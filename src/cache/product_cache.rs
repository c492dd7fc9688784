use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinSet;

use super::CacheStore;
use crate::domain::product::{CategoryId, Product, ProductCategory, ProductId};
use crate::metrics::Metrics;
use crate::store::{ProductCatalog, StorageError};
use crate::utils::{retry_with_backoff, RetryConfig, RetryResult};

// ============================================================================
// Read-Through Product Cache
// ============================================================================
//
// Hit  -> return the cached copy, catalog untouched.
// Miss -> read the catalog, return the row to the caller right away, and
//         write it back to the cache in a detached task.
//
// Population tasks belong to the ProductCache, not to the request that
// triggered them: dropping or timing out the caller's future does not stop
// the write. A failed write is retried briefly, then logged, counted and
// dropped; it never fails the read.
//
// Entries simply expire. Nothing invalidates them on product update or
// delete, so a cached copy can be stale for up to one TTL. Cached copies
// are therefore never used for checkout decisions: `fetch_product` always
// goes to the catalog.
//
// ============================================================================

pub const PRODUCT_TTL: Duration = Duration::from_secs(10 * 60);
pub const CATEGORY_TTL: Duration = Duration::from_secs(60);

const PRODUCT: &str = "product";
const CATEGORY: &str = "category";

pub fn product_key(id: ProductId) -> String {
    format!("product:{id}")
}

pub fn category_key(id: CategoryId) -> String {
    format!("product_category:{id}")
}

#[derive(Clone, Debug)]
pub struct CacheSettings {
    pub product_ttl: Duration,
    pub category_ttl: Duration,
    pub population_retry: RetryConfig,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            product_ttl: PRODUCT_TTL,
            category_ttl: CATEGORY_TTL,
            // first write plus two retries
            population_retry: RetryConfig {
                max_attempts: 3,
                initial_delay: Duration::from_millis(200),
                max_delay: Duration::from_secs(2),
                multiplier: 2.0,
            },
        }
    }
}

pub struct ProductCache {
    store: Arc<dyn CacheStore>,
    catalog: Arc<dyn ProductCatalog>,
    metrics: Arc<Metrics>,
    settings: CacheSettings,
    populations: Mutex<JoinSet<()>>,
}

impl ProductCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        catalog: Arc<dyn ProductCatalog>,
        metrics: Arc<Metrics>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            metrics,
            settings,
            populations: Mutex::new(JoinSet::new()),
        }
    }

    /// The cached copy, or `None` on a miss. Cache failures count as misses.
    pub async fn cached_product(&self, id: ProductId) -> Option<Product> {
        self.lookup(&product_key(id), PRODUCT).await
    }

    /// Read-through lookup. `Ok(None)` when the catalog has no such product.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StorageError> {
        if let Some(product) = self.cached_product(id).await {
            return Ok(Some(product));
        }

        self.fetch_product(id).await
    }

    /// Authoritative catalog read that refreshes the cache as a side effect.
    pub async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, StorageError> {
        let product = self.catalog.get_product(id).await?;

        if let Some(product) = &product {
            self.populate(product_key(id), product, self.settings.product_ttl, PRODUCT);
        }

        Ok(product)
    }

    pub async fn get_category(
        &self,
        id: CategoryId,
    ) -> Result<Option<ProductCategory>, StorageError> {
        let key = category_key(id);
        if let Some(category) = self.lookup(&key, CATEGORY).await {
            return Ok(Some(category));
        }

        let category = self.catalog.get_category(id).await?;

        if let Some(category) = &category {
            self.populate(key, category, self.settings.category_ttl, CATEGORY);
        }

        Ok(category)
    }

    /// Wait for every population task started so far. Called at shutdown.
    pub async fn drain(&self) {
        let mut pending = std::mem::take(&mut *self.lock_populations());

        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Cache population task did not complete");
            }
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str, entity: &'static str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    self.metrics.record_cache_lookup(entity, "hit");
                    tracing::debug!(key = %key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    self.metrics.record_cache_lookup(entity, "error");
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                self.metrics.record_cache_lookup(entity, "miss");
                tracing::debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                self.metrics.record_cache_lookup(entity, "error");
                tracing::error!(key = %key, error = %e, "Cache read failed, falling back to catalog");
                None
            }
        }
    }

    fn populate<T: Serialize>(&self, key: String, value: &T, ttl: Duration, entity: &'static str) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.metrics.record_cache_population_failure(entity);
                tracing::error!(key = %key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        let store = Arc::clone(&self.store);
        let metrics = Arc::clone(&self.metrics);
        let retry = self.settings.population_retry.clone();

        let task = async move {
            tracing::debug!(key = %key, "Starting cache population");

            let result = retry_with_backoff(retry, |_attempt| {
                let store = Arc::clone(&store);
                let key = key.clone();
                let payload = payload.clone();
                async move { store.set_ex(&key, &payload, ttl).await }
            })
            .await;

            match result {
                RetryResult::Success(()) => {
                    tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache populated");
                }
                RetryResult::Exhausted { attempts, error } => {
                    metrics.record_cache_population_failure(entity);
                    tracing::error!(
                        key = %key,
                        attempts = attempts,
                        error = %error,
                        "Cache population failed, dropping entry"
                    );
                }
            }
        };

        let mut populations = self.lock_populations();
        // reap finished tasks so the set does not grow without bound
        while populations.try_join_next().is_some() {}
        populations.spawn(task);
    }

    fn lock_populations(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.populations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
