//! Flat, read-only views assembled from partitions.
//!
//! A [`Snapshot`] is an independent copy: later writes to the store do not
//! show up in it, and nothing done to it touches the store.

mod query;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{TemporaError, TemporaResult};
use crate::pool::{Entity, EntityPool, PoolConfig, SchemaRegistry};
use crate::statement::{resource_term, Statement, StatementPattern, Term};
use crate::storage::{ContainerId, Graph};
use crate::store::TemporalStore;
use crate::time::TimeSpan;
use crate::vocab::rdf;

pub use query::{Bindings, PatternTerm, TriplePattern};

/// Statements merged from a set of partitions and the global container.
#[derive(Debug)]
pub struct Snapshot {
    store: TemporalStore,
    graph: Graph,
    partitions: Vec<ContainerId>,
}

impl Snapshot {
    pub(crate) fn new(store: TemporalStore, graph: Graph, partitions: Vec<ContainerId>) -> Self {
        Self {
            store,
            graph,
            partitions,
        }
    }

    /// The store this snapshot was assembled from.
    #[must_use]
    pub fn store(&self) -> &TemporalStore {
        &self.store
    }

    /// Partitions merged into this snapshot (the global container is implied).
    #[must_use]
    pub fn partitions(&self) -> &[ContainerId] {
        &self.partitions
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.graph.iter()
    }

    #[must_use]
    pub fn contains(&self, statement: &Statement) -> bool {
        self.graph.contains(statement)
    }

    pub fn match_statements<'a>(&'a self, pattern: &'a StatementPattern) -> impl Iterator<Item = &'a Statement> + 'a {
        self.graph.matching(pattern)
    }

    /// True if `uri` is the subject of any statement in the snapshot.
    #[must_use]
    pub fn contains_resource(&self, uri: &str) -> bool {
        self.graph.has_subject(&resource_term(uri))
    }

    /// Every statement about `uri`, sorted.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if `uri` is not the subject of any statement.
    pub fn resource(&self, uri: &str) -> TemporaResult<Vec<&Statement>> {
        let mut statements: Vec<&Statement> = self.graph.about(&resource_term(uri)).collect();
        if statements.is_empty() {
            return Err(TemporaError::resource_not_found(uri));
        }
        statements.sort();
        Ok(statements)
    }

    /// Subjects typed `type_iri`, sorted.
    #[must_use]
    pub fn resources_of_type(&self, type_iri: &str) -> Vec<String> {
        self.resources_with(rdf::TYPE, Some(&Term::iri(type_iri)))
    }

    /// Subjects of statements with `predicate` (and `object`, when given), sorted.
    #[must_use]
    pub fn resources_with(&self, predicate: &str, object: Option<&Term>) -> Vec<String> {
        let mut pattern = StatementPattern::any().predicate(predicate);
        if let Some(object) = object {
            pattern = pattern.object(object.clone());
        }
        let uris: BTreeSet<String> = self
            .graph
            .matching(&pattern)
            .filter_map(|stmt| stmt.subject.resource_key())
            .collect();
        uris.into_iter().collect()
    }

    /// The entity's lifetime according to the originating store; `None` when
    /// the store has no type assertion for it.
    ///
    /// # Errors
    ///
    /// Returns `IncoherentData` when the store holds conflicting type
    /// assertions.
    pub fn entity_lifetime(&self, uri: &str) -> TemporaResult<Option<TimeSpan>> {
        match self.store.entity_lifetime(uri) {
            Ok(span) => Ok(Some(span)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Variable bindings for every solution of `patterns`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for a constant predicate that is not an IRI.
    pub fn select(&self, patterns: &[TriplePattern]) -> TemporaResult<Vec<Bindings>> {
        query::solve(&self.graph, patterns)
    }

    /// True if `patterns` has at least one solution.
    ///
    /// # Errors
    ///
    /// See [`Snapshot::select`].
    pub fn ask(&self, patterns: &[TriplePattern]) -> TemporaResult<bool> {
        Ok(!query::solve(&self.graph, patterns)?.is_empty())
    }

    /// A new snapshot holding `template` instantiated for every solution of
    /// `patterns`, bound to the same store. This snapshot is not modified.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` when the template uses a variable the patterns
    /// do not bind.
    pub fn construct(&self, template: &[TriplePattern], patterns: &[TriplePattern]) -> TemporaResult<Self> {
        let graph = query::construct(&self.graph, template, patterns)?;
        Ok(Self::new(self.store.clone(), graph, self.partitions.clone()))
    }

    /// Materializes entities from this snapshot.
    ///
    /// # Errors
    ///
    /// Returns `IncoherentData` when an admitted resource has more than one
    /// type.
    pub fn build_pool(&self, config: &PoolConfig) -> TemporaResult<EntityPool> {
        EntityPool::build(self, config)
    }

    /// Materializes a single entity without following its references.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` when the resource is absent or untyped, and
    /// `IncoherentData` when it has more than one type.
    pub fn load_entity(&self, uri: &str, schema: Arc<SchemaRegistry>) -> TemporaResult<Entity> {
        self.resource(uri).map_err(|_| TemporaError::entity_not_found(uri))?;
        let config = PoolConfig::new().seed(uri).follow_references(false).schema(schema);
        let pool = self.build_pool(&config)?;
        pool.entity(uri).cloned()
    }

    /// Materializes every resource with `predicate` (and `object`, when
    /// given), without following references.
    ///
    /// # Errors
    ///
    /// See [`Snapshot::build_pool`].
    pub fn load_entities_with(
        &self,
        predicate: &str,
        object: Option<&Term>,
        schema: Arc<SchemaRegistry>,
    ) -> TemporaResult<EntityPool> {
        let config = PoolConfig::new()
            .seeds(self.resources_with(predicate, object))
            .follow_references(false)
            .schema(schema);
        self.build_pool(&config)
    }
}
