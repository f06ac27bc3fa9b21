//! Entity pools: typed, cross-linked entities materialized from a snapshot.
//!
//! A pool is built once by [`EntityPool::build`] and never updated; a new read
//! builds a new pool. Each resource yields at most one entity. References to
//! resources that were never constructed (filtered out, untyped, absent, or
//! not followed) stay unresolved and are reported by
//! [`EntityPool::unresolved_links`] instead of failing the build.

mod config;
mod entity;
mod filter;
mod history;
mod resolver;
mod schema;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::{TemporaError, TemporaResult};
use crate::snapshot::Snapshot;

pub use config::PoolConfig;
pub use entity::{Entity, Link, UnresolvedLink};
pub use filter::{EntityFilter, ResourceFilter};
pub use history::{EntityVersion, SlotValue, TimeBasedEntity};
pub(crate) use resolver::materialize;
pub use schema::{EntitySchema, PropertyKind, PropertySpec, SchemaRegistry};

/// Counters from one pool build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Resources taken off the work queue.
    pub visited: usize,
    pub constructed: usize,
    /// Entities left after entity filters.
    pub entities: usize,
    pub untyped: usize,
    pub rejected_by_type: usize,
    pub rejected_by_resource_filter: usize,
    pub rejected_by_entity_filter: usize,
    pub resolved_links: usize,
    pub unresolved_links: usize,
}

/// Referrer handles by predicate, for one entity.
type ReverseIndex = HashMap<String, Vec<usize>>;

/// The entities materialized in one resolution pass.
///
/// # Examples
///
/// ```
/// use tempora::{PoolConfig, Statement, StoreConfig, TemporalStore, Term};
///
/// let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
/// store.add_global(Statement::type_assertion("http://ex/a", "http://ex/Node")).unwrap();
/// store.add_global(Statement::type_assertion("http://ex/b", "http://ex/Node")).unwrap();
/// store.add_global(Statement::new("http://ex/a", "http://ex/next", Term::iri("http://ex/b"))).unwrap();
/// store.add_global(Statement::new("http://ex/b", "http://ex/next", Term::iri("http://ex/a"))).unwrap();
///
/// let pool = store.snapshot_all().unwrap().build_pool(&PoolConfig::new()).unwrap();
/// let b = pool.reference("http://ex/a", "http://ex/next").unwrap().unwrap();
/// assert_eq!(b.uri(), "http://ex/b");
/// assert_eq!(pool.reference("http://ex/b", "http://ex/next").unwrap().unwrap().uri(), "http://ex/a");
/// ```
#[derive(Debug)]
pub struct EntityPool {
    slots: Vec<Option<Entity>>,
    by_uri: HashMap<String, usize>,
    passive: Vec<OnceLock<ReverseIndex>>,
    schema: Arc<SchemaRegistry>,
    unresolved: Vec<UnresolvedLink>,
    stats: PoolStats,
}

impl EntityPool {
    /// Materializes entities from `snapshot` according to `config`.
    ///
    /// # Errors
    ///
    /// Returns `IncoherentData` when an admitted resource has more than one
    /// type, or a type that is not an IRI. Filtered, untyped and missing
    /// resources are not errors.
    pub fn build(snapshot: &Snapshot, config: &PoolConfig) -> TemporaResult<Self> {
        let resolved = resolver::resolve(snapshot.graph(), config)?;
        let passive = resolved.slots.iter().map(|_| OnceLock::new()).collect();
        Ok(Self {
            slots: resolved.slots,
            by_uri: resolved.by_uri,
            passive,
            schema: Arc::clone(config.schema_registry()),
            unresolved: resolved.unresolved,
            stats: resolved.stats,
        })
    }

    fn handle(&self, uri: &str) -> TemporaResult<usize> {
        self.by_uri
            .get(uri)
            .copied()
            .ok_or_else(|| TemporaError::entity_not_found(uri))
    }

    fn at(&self, handle: usize) -> Option<&Entity> {
        self.slots.get(handle).and_then(Option::as_ref)
    }

    /// # Errors
    ///
    /// Returns `EntityNotFound` if the pool has no entity for `uri`.
    pub fn entity(&self, uri: &str) -> TemporaResult<&Entity> {
        self.get(uri).ok_or_else(|| TemporaError::entity_not_found(uri))
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&Entity> {
        self.by_uri.get(uri).and_then(|&h| self.at(h))
    }

    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.by_uri.contains_key(uri)
    }

    /// Entities in construction order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().flatten()
    }

    #[must_use]
    pub fn entities_of_type(&self, type_iri: &str) -> Vec<&Entity> {
        self.entities().filter(|e| e.type_iri() == type_iri).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_uri.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_uri.is_empty()
    }

    /// The first resolved entity in `slot`; `None` when the slot is empty or
    /// unresolved.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if `uri` is not in the pool.
    pub fn reference(&self, uri: &str, slot: &str) -> TemporaResult<Option<&Entity>> {
        Ok(self.references(uri, slot)?.into_iter().next())
    }

    /// Every resolved entity in `slot`, ordered by target term.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if `uri` is not in the pool.
    pub fn references(&self, uri: &str, slot: &str) -> TemporaResult<Vec<&Entity>> {
        let entity = self.entity(uri)?;
        Ok(entity
            .links(slot)
            .iter()
            .filter_map(|link| link.resolved.and_then(|h| self.at(h)))
            .collect())
    }

    /// Entities pointing at `uri` through a passive property. `name` is a
    /// passive slot of the entity's schema, or a predicate IRI.
    ///
    /// The reverse index is computed on first access per entity and cached.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if `uri` is not in the pool.
    pub fn passive(&self, uri: &str, name: &str) -> TemporaResult<Vec<&Entity>> {
        let handle = self.handle(uri)?;
        let predicate = self
            .at(handle)
            .and_then(|entity| self.schema.get(entity.type_iri()))
            .and_then(|schema| schema.property(name))
            .filter(|spec| spec.is_passive())
            .map_or(name, |spec| spec.predicate.as_str());
        let referrers: Vec<&Entity> = self
            .reverse_index(handle)
            .get(predicate)
            .map(|handles| handles.iter().filter_map(|&h| self.at(h)).collect())
            .unwrap_or_default();
        Ok(referrers)
    }

    /// Every entity with a resolved reference to `uri`, through any predicate.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if `uri` is not in the pool.
    pub fn referrers(&self, uri: &str) -> TemporaResult<Vec<&Entity>> {
        let handle = self.handle(uri)?;
        let handles: BTreeSet<usize> = self.reverse_index(handle).values().flatten().copied().collect();
        Ok(handles.into_iter().filter_map(|h| self.at(h)).collect())
    }

    fn reverse_index(&self, handle: usize) -> &ReverseIndex {
        static EMPTY: OnceLock<ReverseIndex> = OnceLock::new();
        match self.passive.get(handle) {
            Some(cell) => cell.get_or_init(|| self.scan_referrers(handle)),
            None => EMPTY.get_or_init(HashMap::new),
        }
    }

    fn scan_referrers(&self, target: usize) -> ReverseIndex {
        let mut index = ReverseIndex::new();
        for (source, entity) in self.slots.iter().enumerate() {
            let Some(entity) = entity else { continue };
            for (_, link) in entity.all_links() {
                if link.resolved == Some(target) {
                    let handles = index.entry(link.predicate().to_string()).or_default();
                    if handles.last() != Some(&source) {
                        handles.push(source);
                    }
                }
            }
        }
        index
    }

    /// Links whose targets were never constructed, in construction order.
    #[must_use]
    pub fn unresolved_links(&self) -> &[UnresolvedLink] {
        &self.unresolved
    }

    #[must_use]
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    #[must_use]
    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }
}
