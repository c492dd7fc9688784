use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

// ============================================================================
// Checkout Value Objects
// ============================================================================

pub type OrderId = i64;
pub type UserId = i64;

/// One requested line. `price` is what the client believes the unit price is.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub items: Vec<CheckoutItem>,
    pub payment_method: String,
    pub shipping_address: String,
    #[serde(default, alias = "idompotency_token")]
    pub idempotency_token: Option<String>,
}

impl CheckoutRequest {
    /// The token to enforce, if any. An empty token counts as absent.
    pub fn idempotency_token(&self) -> Option<&str> {
        self.idempotency_token.as_deref().filter(|token| !token.is_empty())
    }
}

/// Order lifecycle. Checkout only ever writes `Created`; later transitions
/// belong to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn code(self) -> i16 {
        match self {
            OrderStatus::Created => 1,
            OrderStatus::Confirmed => 2,
            OrderStatus::Shipped => 3,
            OrderStatus::Delivered => 4,
            OrderStatus::Cancelled => 5,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(OrderStatus::Created),
            2 => Some(OrderStatus::Confirmed),
            3 => Some(OrderStatus::Shipped),
            4 => Some(OrderStatus::Delivered),
            5 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created" => Ok(OrderStatus::Created),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// One entry of the append-only status log kept in the order detail.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StatusHistoryEntry {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Order row as written by checkout. The detail reference is filled in by
/// the store inside the transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub amount: Decimal,
    pub total_qty: i64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub shipping_address: String,
}

/// Serialized line-item snapshot plus the status history log.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderDetail {
    pub products: String,
    pub order_history: String,
}

impl NewOrderDetail {
    /// Snapshot the validated items and seed the history with "created".
    pub fn for_checkout(
        items: &[CheckoutItem],
        created_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let history = [StatusHistoryEntry {
            status: OrderStatus::Created.as_str().to_string(),
            timestamp: created_at,
        }];

        Ok(Self {
            products: serde_json::to_string(items)?,
            order_history: serde_json::to_string(&history)?,
        })
    }
}

/// Read-side projection of one order for the history listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderHistory {
    pub order_id: OrderId,
    pub total_amount: Decimal,
    pub total_qty: i64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub shipping_address: String,
    pub products: Vec<CheckoutItem>,
    pub history: Vec<StatusHistoryEntry>,
}

// ============================================================================
// Unit Tests
// ============================================================================
