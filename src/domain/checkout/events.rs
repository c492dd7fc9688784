use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{NewOrder, OrderId, UserId};

// ============================================================================
// Domain Events
// These represent state changes that have already been committed
// ============================================================================

/// Base trait for all published domain events
pub trait DomainEvent: Serialize {
    fn event_type(&self) -> &'static str;
    /// Partition key on the transport; keeps one order's events ordered.
    fn aggregate_id(&self) -> String;
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Announced once per successful checkout. `event_id` lets consumers drop
/// redeliveries.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCreatedEvent {
    pub event_id: Uuid,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub payment_method: String,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
}

impl OrderCreatedEvent {
    pub fn for_order(order_id: OrderId, order: &NewOrder, created_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            order_id,
            user_id: order.user_id,
            payment_method: order.payment_method.clone(),
            total_amount: order.amount,
            shipping_address: order.shipping_address.clone(),
            created_at,
        }
    }
}

impl DomainEvent for OrderCreatedEvent {
    fn event_type(&self) -> &'static str {
        "OrderCreated"
    }

    fn aggregate_id(&self) -> String {
        self.order_id.to_string()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}
