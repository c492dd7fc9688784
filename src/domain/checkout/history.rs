use std::sync::Arc;

use super::value_objects::{OrderHistory, OrderStatus, UserId};
use crate::store::{OrderStore, StorageError};

/// A user's orders, newest first, optionally filtered by status.
#[derive(Clone)]
pub struct OrderHistoryService {
    orders: Arc<dyn OrderStore>,
}

impl OrderHistoryService {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    pub async fn order_history(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderHistory>, StorageError> {
        self.orders.order_history(user_id, status).await
    }
}
