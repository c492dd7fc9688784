// ============================================================================
// Cache Layer
// ============================================================================
//
// - CacheStore   : key -> serialized value with per-key TTL (Redis in prod)
// - ProductCache : read-through cache for products and categories on top of
//                  a CacheStore and the ProductCatalog
//
// ============================================================================

mod product_cache;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

pub use redis_store::RedisCacheStore;
pub use product_cache::{category_key, product_key, CacheSettings, ProductCache};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` for a missing or expired key.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}
