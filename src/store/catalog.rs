use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{query_as, FromRow, PgPool, Postgres, QueryBuilder, Row};

use super::{ProductCatalog, StorageError};
use crate::domain::product::{CategoryId, Product, ProductCategory, ProductId, ProductSearch};

// ============================================================================
// PostgreSQL Product Catalog - authoritative product state
// ============================================================================

const GET_PRODUCT_SQL: &str =
    "SELECT id, name, description, price, stock, category_id FROM product WHERE id = $1";

const GET_CATEGORY_SQL: &str = "SELECT id, name FROM product_category WHERE id = $1";

const SEARCH_FROM: &str = " FROM product \
     JOIN product_category ON product.category_id = product_category.id \
     WHERE TRUE";

const SEARCH_COLUMNS: &str = "SELECT product.id, product.name, product.description, \
     product.price, product.stock, product.category_id";

#[derive(Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StorageError> {
        let product = query_as::<Postgres, Product>(GET_PRODUCT_SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        tracing::debug!(product_id = id, found = product.is_some(), "Catalog product lookup");

        Ok(product)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<ProductCategory>, StorageError> {
        let category = query_as::<Postgres, ProductCategory>(GET_CATEGORY_SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    async fn search_products(
        &self,
        search: &ProductSearch,
    ) -> Result<(Vec<Product>, i64), StorageError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        push_filters(&mut count, search);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(SEARCH_COLUMNS);
        push_filters(&mut select, search);
        // order column comes from a closed set, never from caller text
        select
            .push(" ORDER BY ")
            .push(search.order_by.column())
            .push(" ")
            .push(search.sort.keyword())
            .push(", product.id ASC LIMIT ")
            .push_bind(i64::from(search.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(search.offset()).unwrap_or(i64::MAX));

        let products = select
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            total = total,
            returned = products.len(),
            page = search.page(),
            "Catalog search"
        );

        Ok((products, total))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, search: &ProductSearch) {
    builder.push(SEARCH_FROM);

    if let Some(name) = search.name.as_deref().filter(|name| !name.is_empty()) {
        builder
            .push(" AND product.name ILIKE ")
            .push_bind(format!("%{name}%"));
    }
    if let Some(category) = search.category.as_deref().filter(|c| !c.is_empty()) {
        builder
            .push(" AND product_category.name = ")
            .push_bind(category.to_string());
    }
    if let Some(min) = search.min_price {
        builder.push(" AND product.price >= ").push_bind(min);
    }
    if let Some(max) = search.max_price {
        builder.push(" AND product.price <= ").push_bind(max);
    }
}

impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            category_id: row.try_get("category_id")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ProductCategory {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}
