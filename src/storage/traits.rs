//! Abstract statement-store traits.
//!
//! The temporal layer only needs named containers of statements with
//! add/remove/pattern-match primitives. Keeping that behind a trait lets the
//! in-memory backend serve tests and embedded use while other backends plug
//! in unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::statement::{Statement, StatementPattern};

/// Identifier of a named container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A statement together with the container holding it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    pub container: ContainerId,
    pub statement: Statement,
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Container does not exist.
    #[error("Container not found: {0}")]
    ContainerNotFound(ContainerId),

    /// Container already exists.
    #[error("Duplicate container: {0}")]
    DuplicateContainer(ContainerId),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Storage trait for named statement containers.
///
/// # Safety Considerations
/// - Each call should be atomic with respect to other calls
/// - Implementations should handle concurrent access safely
pub trait StatementStore: Send + Sync {
    /// Create an empty container. Returns error if it already exists.
    fn create_container(&self, id: &ContainerId) -> Result<(), StorageError>;

    /// Test whether a container exists.
    fn container_exists(&self, id: &ContainerId) -> Result<bool, StorageError>;

    /// List all container ids.
    fn list_containers(&self) -> Result<Vec<ContainerId>, StorageError>;

    /// Add a statement. Returns false if it was already present.
    fn insert(&self, container: &ContainerId, stmt: Statement) -> Result<bool, StorageError>;

    /// Remove a statement. Returns false if it was absent.
    fn remove(&self, container: &ContainerId, stmt: &Statement) -> Result<bool, StorageError>;

    /// Match statements in one container, or in every container when `None`.
    fn match_statements(
        &self,
        container: Option<&ContainerId>,
        pattern: &StatementPattern,
    ) -> Result<Vec<Quad>, StorageError>;

    /// Test whether any statement matches.
    fn contains_match(
        &self,
        container: Option<&ContainerId>,
        pattern: &StatementPattern,
    ) -> Result<bool, StorageError> {
        Ok(!self.match_statements(container, pattern)?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_statement_store_object_safe(_: &dyn StatementStore) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::ContainerNotFound(ContainerId::new("g1"));
        assert!(err.to_string().contains("Container not found: g1"));

        let err = StorageError::BackendError("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
