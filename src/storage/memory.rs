//! In-memory storage backend.
//!
//! This module provides a thread-safe in-memory implementation of
//! [`StatementStore`]. It is intended for embedded usage, tests, and as a
//! reference implementation.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::statement::{Statement, StatementPattern};
use crate::storage::graph::Graph;
use crate::storage::traits::{ContainerId, Quad, StatementStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory statement store.
#[derive(Debug, Default)]
pub struct InMemoryStatementStore {
    containers: RwLock<BTreeMap<ContainerId, Graph>>,
}

impl InMemoryStatementStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of statements across all containers.
    pub fn total_len(&self) -> Result<usize, StorageError> {
        let containers = self.containers.read().map_err(|_| lock_err("statement.total_len"))?;
        Ok(containers.values().map(Graph::len).sum())
    }
}

impl StatementStore for InMemoryStatementStore {
    fn create_container(&self, id: &ContainerId) -> Result<(), StorageError> {
        let mut containers = self
            .containers
            .write()
            .map_err(|_| lock_err("statement.create_container"))?;
        if containers.contains_key(id) {
            return Err(StorageError::DuplicateContainer(id.clone()));
        }
        containers.insert(id.clone(), Graph::new());
        Ok(())
    }

    fn container_exists(&self, id: &ContainerId) -> Result<bool, StorageError> {
        let containers = self
            .containers
            .read()
            .map_err(|_| lock_err("statement.container_exists"))?;
        Ok(containers.contains_key(id))
    }

    fn list_containers(&self) -> Result<Vec<ContainerId>, StorageError> {
        let containers = self
            .containers
            .read()
            .map_err(|_| lock_err("statement.list_containers"))?;
        Ok(containers.keys().cloned().collect())
    }

    fn insert(&self, container: &ContainerId, stmt: Statement) -> Result<bool, StorageError> {
        let mut containers = self.containers.write().map_err(|_| lock_err("statement.insert"))?;
        let graph = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::ContainerNotFound(container.clone()))?;
        Ok(graph.insert(stmt))
    }

    fn remove(&self, container: &ContainerId, stmt: &Statement) -> Result<bool, StorageError> {
        let mut containers = self.containers.write().map_err(|_| lock_err("statement.remove"))?;
        let graph = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::ContainerNotFound(container.clone()))?;
        Ok(graph.remove(stmt))
    }

    fn match_statements(
        &self,
        container: Option<&ContainerId>,
        pattern: &StatementPattern,
    ) -> Result<Vec<Quad>, StorageError> {
        let containers = self
            .containers
            .read()
            .map_err(|_| lock_err("statement.match_statements"))?;

        let collect = |id: &ContainerId, graph: &Graph, out: &mut Vec<Quad>| {
            out.extend(graph.matching(pattern).map(|stmt| Quad {
                container: id.clone(),
                statement: stmt.clone(),
            }));
        };

        let mut out = Vec::new();
        match container {
            Some(id) => {
                let graph = containers
                    .get(id)
                    .ok_or_else(|| StorageError::ContainerNotFound(id.clone()))?;
                collect(id, graph, &mut out);
            }
            None => {
                for (id, graph) in containers.iter() {
                    collect(id, graph, &mut out);
                }
            }
        }
        Ok(out)
    }

    fn contains_match(
        &self,
        container: Option<&ContainerId>,
        pattern: &StatementPattern,
    ) -> Result<bool, StorageError> {
        let containers = self
            .containers
            .read()
            .map_err(|_| lock_err("statement.contains_match"))?;
        match container {
            Some(id) => containers
                .get(id)
                .map(|graph| graph.contains_match(pattern))
                .ok_or_else(|| StorageError::ContainerNotFound(id.clone())),
            None => Ok(containers.values().any(|graph| graph.contains_match(pattern))),
        }
    }
}
