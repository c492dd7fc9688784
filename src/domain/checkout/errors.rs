use rust_decimal::Decimal;

use super::value_objects::OrderId;
use crate::domain::product::ProductId;
use crate::messaging::PublishError;
use crate::store::StorageError;

// ============================================================================
// Checkout Validation Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Checkout contains no items")]
    EmptyCheckout,

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Product {0} appears in more than one line item")]
    DuplicateLineItem(ProductId),

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i32 },

    #[error("Invalid price {price} for product {product_id}")]
    InvalidPrice { product_id: ProductId, price: Decimal },

    #[error("Price mismatch for product {product_id}: requested {requested}, current {current}")]
    PriceMismatch {
        product_id: ProductId,
        requested: Decimal,
        current: Decimal,
    },

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i64,
    },
}

// ============================================================================
// Checkout Errors
// ============================================================================
//
// Every variant is terminal for the call; nothing is retried here.
//
// `Storage` happens before the order commit: nothing was written.
// `TokenNotRecorded` and `Publish` happen after it: the order exists and
// carries the id reported in the error.
//
// ============================================================================

/// The four externally visible failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutErrorKind {
    DuplicateOrder,
    ValidationError,
    StorageError,
    PublishError,
}

impl CheckoutErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckoutErrorKind::DuplicateOrder => "duplicate_order",
            CheckoutErrorKind::ValidationError => "validation_error",
            CheckoutErrorKind::StorageError => "storage_error",
            CheckoutErrorKind::PublishError => "publish_error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Checkout with idempotency token {token:?} already succeeded")]
    DuplicateOrder { token: String },

    #[error("Checkout validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage failure, no order was created: {0}")]
    Storage(#[source] StorageError),

    #[error("Order {order_id} was committed but its idempotency token was not recorded: {source}")]
    TokenNotRecorded {
        order_id: OrderId,
        #[source]
        source: StorageError,
    },

    #[error("Order {order_id} was committed but OrderCreated was not published: {source}")]
    Publish {
        order_id: OrderId,
        #[source]
        source: PublishError,
    },
}

impl CheckoutError {
    pub fn kind(&self) -> CheckoutErrorKind {
        match self {
            CheckoutError::DuplicateOrder { .. } => CheckoutErrorKind::DuplicateOrder,
            CheckoutError::Validation(_) => CheckoutErrorKind::ValidationError,
            CheckoutError::Storage(_) | CheckoutError::TokenNotRecorded { .. } => {
                CheckoutErrorKind::StorageError
            }
            CheckoutError::Publish { .. } => CheckoutErrorKind::PublishError,
        }
    }

    /// The order that already exists despite the failure, if any.
    pub fn committed_order(&self) -> Option<OrderId> {
        match self {
            CheckoutError::TokenNotRecorded { order_id, .. }
            | CheckoutError::Publish { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }

    pub fn validation_reason(&self) -> Option<&ValidationError> {
        match self {
            CheckoutError::Validation(reason) => Some(reason),
            _ => None,
        }
    }
}
