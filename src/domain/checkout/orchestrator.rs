use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use super::errors::CheckoutError;
use super::events::OrderCreatedEvent;
use super::summary::OrderSummary;
use super::validator::InventoryValidator;
use super::value_objects::{CheckoutRequest, NewOrder, NewOrderDetail, OrderId, OrderStatus};
use crate::messaging::EventPublisher;
use crate::metrics::Metrics;
use crate::store::{IdempotencyGuard, OrderStore, RecordOutcome, StorageError};

// ============================================================================
// Checkout Orchestrator
// ============================================================================
//
//   Start
//     -> IdempotencyChecked   token seen before?       DuplicateOrder
//     -> Validated            every line passes         ValidationError
//     -> Summarized           totals (cannot fail)
//     -> Persisted            order + detail, one tx    StorageError
//     -> IdempotencyRecorded  token recorded            StorageError (committed)
//     -> Published            OrderCreated accepted     PublishError (committed)
//
// Steps run strictly in sequence. Nothing is retried and nothing is
// undone: once the order is persisted, later failures are reported with
// the committed order id. The token pre-check is advisory; two concurrent
// calls with the same token can both get past it.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Start,
    IdempotencyChecked,
    Validated,
    Summarized,
    Persisted,
    IdempotencyRecorded,
    Published,
}

impl CheckoutStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckoutStage::Start => "start",
            CheckoutStage::IdempotencyChecked => "idempotency_checked",
            CheckoutStage::Validated => "validated",
            CheckoutStage::Summarized => "summarized",
            CheckoutStage::Persisted => "persisted",
            CheckoutStage::IdempotencyRecorded => "idempotency_recorded",
            CheckoutStage::Published => "published",
        }
    }
}

pub struct CheckoutOrchestrator {
    idempotency: Arc<dyn IdempotencyGuard>,
    validator: InventoryValidator,
    orders: Arc<dyn OrderStore>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
    step_timeout: Option<Duration>,
}

impl CheckoutOrchestrator {
    pub fn new(
        idempotency: Arc<dyn IdempotencyGuard>,
        validator: InventoryValidator,
        orders: Arc<dyn OrderStore>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            idempotency,
            validator,
            orders,
            publisher,
            metrics,
            step_timeout: None,
        }
    }

    /// Bound every storage call by `limit`. Publishing is bounded by the
    /// publisher's own send timeout, inside its circuit breaker.
    pub fn with_step_timeout(mut self, limit: Duration) -> Self {
        self.step_timeout = Some(limit);
        self
    }

    #[tracing::instrument(
        name = "checkout",
        skip_all,
        fields(user_id = request.user_id, items = request.items.len())
    )]
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<OrderId, CheckoutError> {
        let started = Instant::now();
        let mut stage = CheckoutStage::Start;

        let result = self.run(request, &mut stage).await;

        let outcome = match &result {
            Ok(order_id) => {
                tracing::info!(order_id = order_id, "🛒 Checkout complete");
                "ok"
            }
            Err(e) => {
                match e.committed_order() {
                    Some(order_id) => tracing::error!(
                        order_id = order_id,
                        stage = stage.as_str(),
                        kind = e.kind().as_str(),
                        error = %e,
                        "Checkout failed after the order was committed"
                    ),
                    None => tracing::warn!(
                        stage = stage.as_str(),
                        kind = e.kind().as_str(),
                        error = %e,
                        "Checkout failed, no order created"
                    ),
                }
                e.kind().as_str()
            }
        };
        self.metrics
            .record_checkout(outcome, started.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        request: &CheckoutRequest,
        stage: &mut CheckoutStage,
    ) -> Result<OrderId, CheckoutError> {
        let token = request.idempotency_token();

        if let Some(token) = token {
            let seen = self
                .bounded(self.idempotency.exists(token), StorageError::TimedOut)
                .await
                .map_err(CheckoutError::Storage)?;
            if seen {
                return Err(CheckoutError::DuplicateOrder {
                    token: token.to_string(),
                });
            }
        }
        advance(stage, CheckoutStage::IdempotencyChecked);

        self.bounded(
            self.validator.validate(&request.items),
            CheckoutError::Storage(StorageError::TimedOut),
        )
        .await?;
        advance(stage, CheckoutStage::Validated);

        let summary = OrderSummary::from_items(&request.items);
        let created_at = Utc::now();
        let order = NewOrder {
            user_id: request.user_id,
            amount: summary.total_amount,
            total_qty: summary.total_qty,
            status: OrderStatus::Created,
            payment_method: request.payment_method.clone(),
            shipping_address: request.shipping_address.clone(),
        };
        let detail = NewOrderDetail::for_checkout(&request.items, created_at)
            .map_err(|e| CheckoutError::Storage(e.into()))?;
        advance(stage, CheckoutStage::Summarized);

        let order_id = self
            .bounded(
                self.orders.save_order_and_detail(&order, &detail),
                StorageError::TimedOut,
            )
            .await
            .map_err(CheckoutError::Storage)?;
        advance(stage, CheckoutStage::Persisted);

        // From here on the order exists; failures carry its id.

        if let Some(token) = token {
            match self
                .bounded(self.idempotency.record(token), StorageError::TimedOut)
                .await
            {
                Ok(RecordOutcome::Recorded) => {}
                Ok(RecordOutcome::AlreadyRecorded) => {
                    tracing::warn!(
                        order_id = order_id,
                        "Idempotency token was recorded by a concurrent checkout"
                    );
                }
                Err(source) => {
                    self.metrics.record_post_commit_failure("idempotency_record");
                    return Err(CheckoutError::TokenNotRecorded { order_id, source });
                }
            }
        }
        advance(stage, CheckoutStage::IdempotencyRecorded);

        let event = OrderCreatedEvent::for_order(order_id, &order, created_at);
        if let Err(source) = self.publisher.publish(&event).await {
            self.metrics.record_post_commit_failure("publish");
            return Err(CheckoutError::Publish { order_id, source });
        }
        advance(stage, CheckoutStage::Published);

        Ok(order_id)
    }

    async fn bounded<T, E>(
        &self,
        step: impl Future<Output = Result<T, E>>,
        on_timeout: E,
    ) -> Result<T, E> {
        match self.step_timeout {
            Some(limit) => tokio::time::timeout(limit, step)
                .await
                .unwrap_or(Err(on_timeout)),
            None => step.await,
        }
    }
}

fn advance(stage: &mut CheckoutStage, next: CheckoutStage) {
    tracing::debug!(from = stage.as_str(), to = next.as_str(), "Checkout stage");
    *stage = next;
}

// ============================================================================
// Unit Tests
// ============================================================================
