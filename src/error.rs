//! Error types for Tempora.
//!
//! All errors are strongly typed using thiserror so callers can branch on
//! the condition they care about: lookups that legitimately miss
//! (`EntityNotFound`, `ResourceNotFound`) are recoverable, while
//! `IncoherentData` reports a data-integrity violation that must not be
//! papered over.

use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors raised while constructing input values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid time instant: {reason}")]
    InvalidTimeInstant {
        reason: String,
    },

    #[error("Invalid time span: end ({end}) must be after start ({start})")]
    InvalidTimeSpan {
        start: String,
        end: String,
    },

    #[error("URI cannot be empty")]
    EmptyUri,

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Invalid pattern: {reason}")]
    InvalidPattern {
        reason: String,
    },

    #[error("Invalid query: {reason}")]
    InvalidQuery {
        reason: String,
    },
}

/// Execution errors raised by store, index and pool operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        reason: String,
    },

    #[error("Entity not found: {uri}")]
    EntityNotFound {
        uri: String,
    },

    #[error("Resource not found: {uri}")]
    ResourceNotFound {
        uri: String,
    },

    #[error("Entity already exists: {uri}")]
    EntityAlreadyExists {
        uri: String,
    },

    #[error("Incoherent data for {uri}: {reason} (partitions: {partitions:?})")]
    IncoherentData {
        uri: String,
        reason: String,
        partitions: Vec<String>,
    },

    #[error("No time dimension index available")]
    NoIndexAvailable,

    #[error("Unknown partition: {id}")]
    UnknownPartition {
        id: String,
    },

    #[error("Store mutation attempted from inside an update listener")]
    ReentrantMutation,

    #[error("Storage error: {message}")]
    Storage {
        message: String,
    },
}

/// Top-level error type for Tempora.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemporaError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl From<StorageError> for TemporaError {
    fn from(err: StorageError) -> Self {
        Self::Execution(ExecutionError::Storage {
            message: err.to_string(),
        })
    }
}

impl TemporaError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an `InvalidOperation` execution error.
    #[must_use]
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::Execution(ExecutionError::InvalidOperation {
            reason: reason.into(),
        })
    }

    /// Creates an `EntityNotFound` execution error.
    #[must_use]
    pub fn entity_not_found(uri: impl Into<String>) -> Self {
        Self::Execution(ExecutionError::EntityNotFound { uri: uri.into() })
    }

    /// Creates a `ResourceNotFound` execution error.
    #[must_use]
    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::Execution(ExecutionError::ResourceNotFound { uri: uri.into() })
    }

    /// Creates an `IncoherentData` execution error.
    #[must_use]
    pub fn incoherent(uri: impl Into<String>, reason: impl Into<String>, partitions: Vec<String>) -> Self {
        Self::Execution(ExecutionError::IncoherentData {
            uri: uri.into(),
            reason: reason.into(),
            partitions,
        })
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true for the recoverable "lookup missed" conditions.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Execution(
                ExecutionError::EntityNotFound { .. } | ExecutionError::ResourceNotFound { .. }
            )
        )
    }

    /// Returns true if the underlying data violates an integrity rule.
    #[must_use]
    pub const fn is_incoherent(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::IncoherentData { .. }))
    }

    /// Returns true for errors caused by calling the API in the wrong order or shape.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::Execution(
                ExecutionError::NoIndexAvailable
                    | ExecutionError::InvalidOperation { .. }
                    | ExecutionError::ReentrantMutation
            )
        )
    }
}

/// Result type alias for Tempora operations.
pub type TemporaResult<T> = Result<T, TemporaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_time_span() {
        let err = ValidationError::InvalidTimeSpan {
            start: "1960".to_string(),
            end: "1950".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Invalid time span"));
        assert!(msg.contains("1950"));
    }

    #[test]
    fn test_execution_error_incoherent_lists_partitions() {
        let err = TemporaError::incoherent(
            "http://data/x",
            "two type assertions",
            vec!["tg-1950".to_string(), "tg-1960".to_string()],
        );
        assert!(err.is_incoherent());
        assert!(!err.is_not_found());
        let msg = format!("{err}");
        assert!(msg.contains("http://data/x"));
        assert!(msg.contains("tg-1960"));
    }

    #[test]
    fn test_not_found_is_recoverable() {
        assert!(TemporaError::entity_not_found("a").is_not_found());
        assert!(TemporaError::resource_not_found("a").is_not_found());
        assert!(!TemporaError::internal("boom").is_not_found());
    }

    #[test]
    fn test_usage_errors() {
        let err: TemporaError = ExecutionError::NoIndexAvailable.into();
        assert!(err.is_usage_error());
        assert!(err.is_execution());
        assert!(TemporaError::invalid_operation("duration of an instant").is_usage_error());
        assert!(!TemporaError::entity_not_found("a").is_usage_error());
    }

    #[test]
    fn test_storage_error_converts_to_execution() {
        let err: TemporaError = StorageError::BackendError("poisoned lock: x".to_string()).into();
        assert!(err.is_execution());
        assert!(format!("{err}").contains("poisoned lock"));
    }

    #[test]
    fn test_internal_error() {
        let err = TemporaError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("unexpected state"));
    }
}
