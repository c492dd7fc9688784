use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;

use super::errors::{CheckoutError, ValidationError};
use super::value_objects::CheckoutItem;
use crate::cache::ProductCache;
use crate::domain::product::Product;

// ============================================================================
// Inventory Validator
// ============================================================================
//
// Batch checks first:
//   - at least one line
//   - no product id on more than one line, whatever the lines contain
//
// Then per item, in order:
//   1. product exists
//   2. 0 < quantity <= MAX_LINE_QUANTITY
//   3. price > 0
//   4. price equals the catalog price exactly
//   5. quantity <= current stock
//
// The first violation fails the whole batch. Products are read from the
// catalog through `ProductCache::fetch_product`, never from a cached copy.
// Nothing is reserved: two concurrent checkouts can both pass step 5 for
// the same last unit.
//
// ============================================================================

pub const MAX_LINE_QUANTITY: i32 = 1000;

#[derive(Clone)]
pub struct InventoryValidator {
    products: Arc<ProductCache>,
}

impl InventoryValidator {
    pub fn new(products: Arc<ProductCache>) -> Self {
        Self { products }
    }

    pub async fn validate(&self, items: &[CheckoutItem]) -> Result<(), CheckoutError> {
        if items.is_empty() {
            return Err(ValidationError::EmptyCheckout.into());
        }

        check_unique_products(items)?;

        for item in items {
            let product = self
                .products
                .fetch_product(item.product_id)
                .await
                .map_err(CheckoutError::Storage)?
                .ok_or(ValidationError::ProductNotFound(item.product_id))?;

            check_line(item, &product)?;
        }

        tracing::debug!(items = items.len(), "Checkout items validated");
        Ok(())
    }
}

/// Each product id may appear on one line only.
pub fn check_unique_products(items: &[CheckoutItem]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(items.len());

    match items.iter().find(|item| !seen.insert(item.product_id)) {
        Some(duplicate) => Err(ValidationError::DuplicateLineItem(duplicate.product_id)),
        None => Ok(()),
    }
}

/// Quantity, price and stock checks for one line against its product.
pub fn check_line(item: &CheckoutItem, product: &Product) -> Result<(), ValidationError> {
    if item.quantity <= 0 || item.quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::InvalidQuantity {
            product_id: item.product_id,
            quantity: item.quantity,
        });
    }

    if item.price <= Decimal::ZERO {
        return Err(ValidationError::InvalidPrice {
            product_id: item.product_id,
            price: item.price,
        });
    }

    if item.price != product.price {
        return Err(ValidationError::PriceMismatch {
            product_id: item.product_id,
            requested: item.price,
            current: product.price,
        });
    }

    if i64::from(item.quantity) > product.stock {
        return Err(ValidationError::InsufficientStock {
            product_id: item.product_id,
            requested: item.quantity,
            available: product.stock,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSettings;
    use crate::metrics::Metrics;
    use crate::testing::{product, InMemoryCacheStore, InMemoryCatalog};

    fn item(product_id: i64, quantity: i32, price: Decimal) -> CheckoutItem {
        CheckoutItem {
            product_id,
            quantity,
            price,
        }
    }

    fn validator(catalog: Arc<InMemoryCatalog>) -> InventoryValidator {
        let cache = ProductCache::new(
            Arc::new(InMemoryCacheStore::new()),
            catalog,
            Arc::new(Metrics::new().unwrap()),
            CacheSettings::default(),
        );
        InventoryValidator::new(Arc::new(cache))
    }

    fn reason(result: Result<(), CheckoutError>) -> ValidationError {
        result.unwrap_err().validation_reason().cloned().unwrap()
    }

    #[test]
    fn test_quantity_bounds() {
        let p = product(1, Decimal::TEN, 5000);

        assert!(check_line(&item(1, 1, Decimal::TEN), &p).is_ok());
        assert!(check_line(&item(1, 1000, Decimal::TEN), &p).is_ok());

        for quantity in [0, -3, 1001] {
            assert_eq!(
                check_line(&item(1, quantity, Decimal::TEN), &p),
                Err(ValidationError::InvalidQuantity {
                    product_id: 1,
                    quantity
                })
            );
        }
    }

    #[test]
    fn test_non_positive_price_is_rejected_before_mismatch() {
        let p = product(1, Decimal::TEN, 5);

        for price in [Decimal::ZERO, Decimal::new(-1, 0)] {
            assert_eq!(
                check_line(&item(1, 1, price), &p),
                Err(ValidationError::InvalidPrice {
                    product_id: 1,
                    price
                })
            );
        }
    }

    #[test]
    fn test_price_must_match_exactly() {
        let p = product(1, Decimal::new(1999, 2), 5);

        assert_eq!(
            check_line(&item(1, 1, Decimal::new(1998, 2)), &p),
            Err(ValidationError::PriceMismatch {
                product_id: 1,
                requested: Decimal::new(1998, 2),
                current: Decimal::new(1999, 2),
            })
        );
        // scale differences are not a mismatch
        assert!(check_line(&item(1, 1, Decimal::new(19990, 3)), &p).is_ok());
    }

    #[test]
    fn test_stock_is_checked_last() {
        let p = product(1, Decimal::TEN, 2);

        assert!(check_line(&item(1, 2, Decimal::TEN), &p).is_ok());
        assert_eq!(
            check_line(&item(1, 3, Decimal::TEN), &p),
            Err(ValidationError::InsufficientStock {
                product_id: 1,
                requested: 3,
                available: 2
            })
        );
        // a price mismatch wins over insufficient stock
        assert!(matches!(
            check_line(&item(1, 3, Decimal::ONE), &p),
            Err(ValidationError::PriceMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_checkout_is_rejected() {
        let validator = validator(Arc::new(InMemoryCatalog::new()));
        assert_eq!(reason(validator.validate(&[]).await), ValidationError::EmptyCheckout);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let validator = validator(Arc::new(InMemoryCatalog::new()));
        assert_eq!(
            reason(validator.validate(&[item(9, 1, Decimal::ONE)]).await),
            ValidationError::ProductNotFound(9)
        );
    }

    #[tokio::test]
    async fn test_duplicate_line_item_regardless_of_other_fields() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert(product(1, Decimal::TEN, 100));
        let validator = validator(catalog);

        let items = [item(1, 1, Decimal::TEN), item(1, 5000, Decimal::ZERO)];
        assert_eq!(
            reason(validator.validate(&items).await),
            ValidationError::DuplicateLineItem(1)
        );
    }

    #[tokio::test]
    async fn test_duplicate_wins_over_bad_first_line() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert(product(1, Decimal::TEN, 100));
        let validator = validator(catalog.clone());

        // quantity 0 and a price that matches nothing on the first line
        let items = [item(1, 0, Decimal::ONE), item(1, 1, Decimal::TEN)];
        assert_eq!(
            reason(validator.validate(&items).await),
            ValidationError::DuplicateLineItem(1)
        );
        assert_eq!(catalog.reads(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_of_unknown_product() {
        let validator = validator(Arc::new(InMemoryCatalog::new()));

        let items = [item(8, 1, Decimal::ONE), item(9, 1, Decimal::ONE), item(8, 2, Decimal::ONE)];
        assert_eq!(
            reason(validator.validate(&items).await),
            ValidationError::DuplicateLineItem(8)
        );
    }

    #[test]
    fn test_unique_products_pass() {
        let items = [item(1, 1, Decimal::ONE), item(2, 1, Decimal::ONE)];
        assert_eq!(check_unique_products(&items), Ok(()));
    }

    #[tokio::test]
    async fn test_first_violation_wins() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert(product(1, Decimal::TEN, 1));
        catalog.insert(product(2, Decimal::ONE, 1));
        let validator = validator(catalog);

        let items = [item(1, 0, Decimal::TEN), item(2, 1, Decimal::TEN)];
        assert!(matches!(
            reason(validator.validate(&items).await),
            ValidationError::InvalidQuantity { product_id: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_validation_reads_catalog_even_when_cached() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert(product(1, Decimal::TEN, 3));
        let validator = validator(catalog.clone());
        let items = [item(1, 1, Decimal::TEN)];

        validator.validate(&items).await.unwrap();
        validator.validate(&items).await.unwrap();

        assert_eq!(catalog.reads(), 2);
    }

    #[tokio::test]
    async fn test_catalog_failure_is_storage_error() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.fail(true);
        let validator = validator(catalog);

        let err = validator.validate(&[item(1, 1, Decimal::ONE)]).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Storage(_)));
        assert_eq!(err.committed_order(), None);
    }
}
