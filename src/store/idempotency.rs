use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, PgPool};

use super::{IdempotencyGuard, RecordOutcome, StorageError};

// ============================================================================
// PostgreSQL Idempotency Guard
// ============================================================================
//
// Tokens live in `order_request_log` under a UNIQUE constraint. A token row
// is never deleted by this service.
//
// `exists` is a fast-path check only. Two concurrent checkouts carrying the
// same token can both pass it; the UNIQUE constraint then makes the second
// `record` report `AlreadyRecorded` instead of a storage failure.
//
// ============================================================================

const TOKEN_EXISTS_SQL: &str =
    "SELECT EXISTS (SELECT 1 FROM order_request_log WHERE idempotency_token = $1)";

const RECORD_TOKEN_SQL: &str =
    "INSERT INTO order_request_log (idempotency_token, create_time) VALUES ($1, $2)";

#[derive(Clone)]
pub struct PgIdempotencyGuard {
    pool: PgPool,
}

impl PgIdempotencyGuard {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyGuard for PgIdempotencyGuard {
    async fn exists(&self, token: &str) -> Result<bool, StorageError> {
        let (exists,): (bool,) = query_as(TOKEN_EXISTS_SQL)
            .bind(token)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn record(&self, token: &str) -> Result<RecordOutcome, StorageError> {
        let inserted = query(RECORD_TOKEN_SQL)
            .bind(token)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(StorageError::from);

        classify_record(inserted)
    }
}

/// A uniqueness violation means another checkout recorded the token first.
fn classify_record(inserted: Result<(), StorageError>) -> Result<RecordOutcome, StorageError> {
    match inserted {
        Ok(()) => Ok(RecordOutcome::Recorded),
        Err(error) if error.is_unique_violation() => {
            tracing::warn!(error = %error, "Idempotency token was already recorded");
            Ok(RecordOutcome::AlreadyRecorded)
        }
        Err(error) => Err(error),
    }
}
