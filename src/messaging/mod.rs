// ============================================================================
// Messaging - hand-off of domain events to the broker
// ============================================================================

mod redpanda;

use async_trait::async_trait;

use crate::domain::checkout::OrderCreatedEvent;

pub use redpanda::RedpandaPublisher;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("broker rejected the message: {0}")]
    Rejected(String),

    #[error("kafka client error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("circuit breaker open for {0}")]
    CircuitOpen(&'static str),

    #[error("failed to encode event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publish timed out")]
    TimedOut,
}

/// Synchronous hand-off: returns once the broker has accepted the message
/// (not once consumers have seen it).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &OrderCreatedEvent) -> Result<(), PublishError>;
}
