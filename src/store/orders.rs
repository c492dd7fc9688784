use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{query_as, PgPool};

use super::{OrderStore, StorageError};
use crate::domain::checkout::{
    CheckoutItem, NewOrder, NewOrderDetail, OrderHistory, OrderId, OrderStatus, StatusHistoryEntry,
    UserId,
};

// ============================================================================
// PostgreSQL Order Store
// ============================================================================
//
// `save_order_and_detail` is one transaction:
//   1. INSERT order_detail  -> detail id
//   2. INSERT orders referencing that detail id -> order id
//   3. COMMIT
//
// If any step fails, or the future is dropped before COMMIT, the
// transaction is rolled back when it goes out of scope, so neither row is
// ever visible on its own. Product stock is not touched here.
//
// ============================================================================

const INSERT_ORDER_DETAIL_SQL: &str =
    "INSERT INTO order_detail (products, order_history) VALUES ($1, $2) RETURNING id";

const INSERT_ORDER_SQL: &str = "INSERT INTO orders (
        user_id, order_detail_id, amount, total_qty, status, payment_method, shipping_address
    ) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id";

const ORDER_HISTORY_SQL: &str = "SELECT o.id, o.amount, o.total_qty, o.status,
            o.payment_method, o.shipping_address, d.products, d.order_history
     FROM orders o
     JOIN order_detail d ON d.id = o.order_detail_id
     WHERE o.user_id = $1 AND ($2::SMALLINT IS NULL OR o.status = $2)
     ORDER BY o.id DESC";

type HistoryRow = (i64, Decimal, i64, i16, String, String, String, String);

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn save_order_and_detail(
        &self,
        order: &NewOrder,
        detail: &NewOrderDetail,
    ) -> Result<OrderId, StorageError> {
        let mut tx = self.pool.begin().await?;

        let (detail_id,): (i64,) = query_as(INSERT_ORDER_DETAIL_SQL)
            .bind(&detail.products)
            .bind(&detail.order_history)
            .fetch_one(&mut *tx)
            .await?;

        let (order_id,): (i64,) = query_as(INSERT_ORDER_SQL)
            .bind(order.user_id)
            .bind(detail_id)
            .bind(order.amount)
            .bind(order.total_qty)
            .bind(order.status.code())
            .bind(&order.payment_method)
            .bind(&order.shipping_address)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = order_id,
            order_detail_id = detail_id,
            user_id = order.user_id,
            "✅ Transactionally persisted order and order detail"
        );

        Ok(order_id)
    }

    async fn order_history(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderHistory>, StorageError> {
        let rows: Vec<HistoryRow> = query_as(ORDER_HISTORY_SQL)
            .bind(user_id)
            .bind(status.map(OrderStatus::code))
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(user_id = user_id, orders = rows.len(), "Loaded order history");

        rows.into_iter().map(decode_history_row).collect()
    }
}

fn decode_history_row(row: HistoryRow) -> Result<OrderHistory, StorageError> {
    let (order_id, total_amount, total_qty, status, payment_method, shipping_address, products, history) =
        row;

    let status = OrderStatus::from_code(status).ok_or(StorageError::UnknownStatus(status))?;
    let products: Vec<CheckoutItem> = serde_json::from_str(&products)?;
    let history: Vec<StatusHistoryEntry> = serde_json::from_str(&history)?;

    Ok(OrderHistory {
        order_id,
        total_amount,
        total_qty,
        status,
        payment_method,
        shipping_address,
        products,
        history,
    })
}
