use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Product Catalog Models
// ============================================================================
//
// The catalog owns these records. Checkout only reads them; the cached
// copies held in Redis are advisory and may lag behind for up to one TTL.
//
// ============================================================================

pub type ProductId = i64;
pub type CategoryId = i64;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Authoritative unit price.
    pub price: Decimal,
    /// Units currently available.
    pub stock: i64,
    pub category_id: CategoryId,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProductCategory {
    pub id: CategoryId,
    pub name: String,
}

// ============================================================================
// Catalog Search
// ============================================================================

/// Sortable columns. Anything outside this list sorts by name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProductOrder {
    #[default]
    Name,
    Price,
    Stock,
    Id,
}

impl ProductOrder {
    pub fn from_param(raw: &str) -> Self {
        match raw.trim().trim_start_matches("product.").to_ascii_lowercase().as_str() {
            "price" => Self::Price,
            "stock" => Self::Stock,
            "id" => Self::Id,
            _ => Self::Name,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "product.name",
            Self::Price => "product.price",
            Self::Stock => "product.stock",
            Self::Id => "product.id",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `DESC` in any case is descending; everything else is ascending.
    pub fn from_param(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Catalog search filters. Unset filters match everything.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductSearch {
    /// Case-insensitive substring of the product name.
    pub name: Option<String>,
    /// Exact category name.
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    pub order_by: ProductOrder,
    pub sort: SortDirection,
}

impl Default for ProductSearch {
    fn default() -> Self {
        Self {
            name: None,
            category: None,
            min_price: None,
            max_price: None,
            page: 1,
            page_size: 10,
            order_by: ProductOrder::default(),
            sort: SortDirection::default(),
        }
    }
}

impl ProductSearch {
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u32 {
        self.page_size.max(1)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }

    /// Whether `product`, filed under `category`, passes every filter.
    pub fn matches(&self, product: &Product, category: Option<&str>) -> bool {
        let name_ok = self.name.as_deref().map_or(true, |needle| {
            product.name.to_lowercase().contains(&needle.to_lowercase())
        });
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |wanted| category == Some(wanted));
        let min_ok = self.min_price.map_or(true, |min| product.price >= min);
        let max_ok = self.max_price.map_or(true, |max| product.price <= max);

        name_ok && category_ok && min_ok && max_ok
    }
}

/// One page of search results plus the size of the whole result set.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub total_pages: i64,
}

impl ProductPage {
    pub fn new(products: Vec<Product>, search: &ProductSearch, total_count: i64) -> Self {
        let page_size = search.limit();
        let per_page = i64::from(page_size);
        Self {
            products,
            page: search.page(),
            page_size,
            total_count,
            total_pages: (total_count + per_page - 1) / per_page,
        }
    }

    pub fn has_next(&self) -> bool {
        i64::from(self.page) < self.total_pages
    }
}
