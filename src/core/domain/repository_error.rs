use thiserror::Error;

/// Failure carried by a `TransactionResult` and returned by repository calls.
///
/// Values are compared by equality in tests, so every variant only holds
/// owned, comparable data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Constraint violation: {entity_type} - {details}")]
    ConstraintViolation {
        entity_type: String,
        details: String,
    },

    #[error("Entity not found: {entity_type} - {details}")]
    NotFound {
        entity_type: String,
        details: String,
    },

    #[error("Concurrent modification detected: {entity_type}")]
    ConcurrencyError { entity_type: String },

    #[error("Validation error: {details}")]
    Validation { details: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Failed to commit transaction: {0}")]
    Commit(String),

    #[error("Failed to rollback transaction: {0}")]
    Rollback(String),

    #[error("Failed to dispatch repository call: {0}")]
    Dispatch(String),

    #[error("Unit of work panicked: {0}")]
    Panicked(String),
}

impl RepositoryError {
    pub fn constraint_violation(entity_type: &str, details: impl Into<String>) -> Self {
        RepositoryError::ConstraintViolation {
            entity_type: entity_type.to_string(),
            details: details.into(),
        }
    }

    pub fn not_found(entity_type: &str, details: impl Into<String>) -> Self {
        RepositoryError::NotFound {
            entity_type: entity_type.to_string(),
            details: details.into(),
        }
    }

    pub fn commit(details: impl Into<String>) -> Self {
        RepositoryError::Commit(details.into())
    }

    pub fn rollback(details: impl Into<String>) -> Self {
        RepositoryError::Rollback(details.into())
    }

    pub fn dispatch(details: impl Into<String>) -> Self {
        RepositoryError::Dispatch(details.into())
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, RepositoryError::ConstraintViolation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}
