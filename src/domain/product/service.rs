use std::sync::Arc;

use super::models::{CategoryId, Product, ProductCategory, ProductId, ProductPage, ProductSearch};
use crate::cache::ProductCache;
use crate::store::{ProductCatalog, StorageError};

/// Plain read path for products and categories. A row that does not exist
/// is an empty result, not an error. Search bypasses the cache.
#[derive(Clone)]
pub struct ProductService {
    cache: Arc<ProductCache>,
    catalog: Arc<dyn ProductCatalog>,
}

impl ProductService {
    pub fn new(cache: Arc<ProductCache>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { cache, catalog }
    }

    pub async fn search(&self, search: &ProductSearch) -> Result<ProductPage, StorageError> {
        let (products, total_count) = self.catalog.search_products(search).await?;
        let page = ProductPage::new(products, search, total_count);

        tracing::debug!(
            total_count = page.total_count,
            page = page.page,
            total_pages = page.total_pages,
            "Product search"
        );

        Ok(page)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StorageError> {
        let product = self.cache.get_product(id).await?;
        if product.is_none() {
            tracing::debug!(product_id = id, "Product not found");
        }
        Ok(product)
    }

    pub async fn get_category(
        &self,
        id: CategoryId,
    ) -> Result<Option<ProductCategory>, StorageError> {
        let category = self.cache.get_category(id).await?;
        if category.is_none() {
            tracing::debug!(category_id = id, "Category not found");
        }
        Ok(category)
    }
}
