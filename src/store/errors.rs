use sqlx::error::{DatabaseError, ErrorKind};

// ============================================================================
// Storage Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("unique constraint violated")]
    UniqueViolation(#[source] sqlx::Error),

    #[error("failed to encode stored payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown order status code: {0}")]
    UnknownStatus(i16),

    #[error("storage call timed out")]
    TimedOut,
}

impl StorageError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StorageError::UniqueViolation(_))
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => StorageError::UniqueViolation(error),
            _ => StorageError::Database(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_unique_violations() {
        let error = StorageError::from(sqlx::Error::RowNotFound);
        assert!(!error.is_unique_violation());
        assert!(matches!(error, StorageError::Database(_)));
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(StorageError::TimedOut.to_string(), "storage call timed out");
    }
}
