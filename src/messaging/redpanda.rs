use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use super::{EventPublisher, PublishError};
use crate::domain::checkout::{DomainEvent, OrderCreatedEvent};
use crate::metrics::Metrics;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

// ============================================================================
// Redpanda Publisher - OrderCreated events onto a fixed topic
// ============================================================================
//
// The producer waits for `acks=all` before `publish` returns. Records are
// keyed by order id so every event of one order lands on one partition.
// Each send is bounded by `send_timeout`; a broker refusal is reported as
// `PublishError::Rejected`.
//
// ============================================================================

const BREAKER_NAME: &str = "redpanda";

pub struct RedpandaPublisher {
    producer: FutureProducer,
    topic: String,
    send_timeout: Duration,
    circuit_breaker: CircuitBreaker,
    metrics: Arc<Metrics>,
}

impl RedpandaPublisher {
    pub fn new(
        brokers: &str,
        topic: impl Into<String>,
        send_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Result<Self, PublishError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("acks", "all")
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .create()?;

        let circuit_breaker = CircuitBreaker::new(BREAKER_NAME, CircuitBreakerConfig::default())
            .with_metrics(metrics.clone());

        Ok(Self {
            producer,
            topic: topic.into(),
            send_timeout,
            circuit_breaker,
            metrics,
        })
    }

    async fn send<E: DomainEvent>(&self, event: &E) -> Result<(), PublishError> {
        let key = event.aggregate_id();
        let payload = serde_json::to_string(event)?;
        let timestamp = event.timestamp().timestamp_millis();

        // The deadline sits inside the breaker call, so a stalled send is
        // counted as a failure.
        let result = self
            .circuit_breaker
            .call(async {
                let record = FutureRecord::to(&self.topic)
                    .key(key.as_str())
                    .payload(payload.as_str())
                    .timestamp(timestamp);

                let delivery = self
                    .producer
                    .send(record, Timeout::After(self.send_timeout));

                match tokio::time::timeout(self.send_timeout, delivery).await {
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err((e, _))) => Err(classify_send_error(e)),
                    Err(_) => Err(PublishError::TimedOut),
                }
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    topic = %self.topic,
                    key = %key,
                    event_type = event.event_type(),
                    "Published to Redpanda"
                );
                Ok(())
            }
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::error!(topic = %self.topic, "Circuit breaker open - Redpanda unavailable");
                Err(PublishError::CircuitOpen(BREAKER_NAME))
            }
            Err(CircuitBreakerError::OperationFailed(e)) => {
                tracing::error!(
                    error = %e,
                    topic = %self.topic,
                    key = %key,
                    "Failed to publish to Redpanda"
                );
                Err(e)
            }
        }
    }
}

/// Delivery reports carrying a broker error code mean the broker refused
/// the record; anything else is a client-side failure.
fn classify_send_error(error: KafkaError) -> PublishError {
    match error {
        KafkaError::MessageProduction(code) => PublishError::Rejected(code.to_string()),
        other => PublishError::Kafka(other),
    }
}

#[async_trait]
impl EventPublisher for RedpandaPublisher {
    async fn publish(&self, event: &OrderCreatedEvent) -> Result<(), PublishError> {
        let result = self.send(event).await;
        self.metrics.record_publish(event.event_type(), result.is_ok());
        result
    }
}
