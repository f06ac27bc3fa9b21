//! Temporal graph store.
//!
//! Statements are written to one container per canonical [`TimeSpan`], plus a
//! global container for time-invariant facts. Each partition gets a metadata
//! record in a dedicated container, and the time dimension index is fed from
//! those records so "what was true at T" does not scan every partition.
//!
//! ## Concurrency
//!
//! Mutations are serialized by a mutation lock held from the first backend
//! write until every listener has seen the resulting events. The partition
//! table and the index sit behind a read/write lock that mutations hold
//! exclusively while they touch the backend; snapshot assembly holds it shared
//! while copying, so a snapshot never observes half of a mutation. Replacing
//! an entity (purge, then add) is one mutation.
//!
//! The mutation lock guards no data, so a panic while it is held (a listener
//! is the usual suspect) does not disable later writes.

mod ids;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{ExecutionError, TemporaError, TemporaResult, ValidationError};
use crate::index::{record, TimeDimensionIndexer};
use crate::monitor::bus::is_dispatching;
use crate::monitor::{UpdateBus, UpdateEvent};
use crate::pool::{materialize, Entity, SchemaRegistry, TimeBasedEntity};
use crate::snapshot::Snapshot;
use crate::statement::{resource_term, Statement, StatementPattern, Term};
use crate::storage::{ContainerId, Graph, InMemoryStatementStore, Quad, StatementStore, StorageError};
use crate::time::{TimeInstant, TimeSpan};
use crate::vocab::rdf;

pub use ids::{IdAllocator, SequentialAllocator, UuidAllocator};

const MAX_ID_ATTEMPTS: usize = 1024;

fn lock_err(context: &'static str) -> TemporaError {
    StorageError::BackendError(format!("poisoned lock: {context}")).into()
}

#[derive(Debug, Default)]
struct StoreState {
    /// Partition id to canonical span.
    partitions: HashMap<ContainerId, TimeSpan>,
    index: TimeDimensionIndexer,
}

struct StoreInner {
    config: StoreConfig,
    backend: Arc<dyn StatementStore>,
    global: ContainerId,
    metadata: ContainerId,
    mutation: Mutex<()>,
    state: RwLock<StoreState>,
    bus: UpdateBus,
    ids: Box<dyn IdAllocator>,
}

/// Where a statement goes.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Global,
    Partition(TimeSpan),
}

/// How a batch treats an entity that is already stored.
#[derive(Debug, Clone, Copy)]
enum Existing<'a> {
    Ignore,
    Reject(&'a str),
    Replace(&'a str),
}

impl Scope {
    fn of(timespan: Option<&TimeSpan>) -> Result<Self, ValidationError> {
        match timespan {
            Some(span) if span.start() == TimeInstant::EndOfTime => Err(ValidationError::InvalidTimeSpan {
                start: span.start().to_string(),
                end: "after the end of time".to_string(),
            }),
            Some(span) if !span.is_existence() => Ok(Self::Partition(span.canonicalize())),
            _ => Ok(Self::Global),
        }
    }
}

/// Handle to a time-partitioned statement store.
///
/// Cloning is cheap and every clone refers to the same store.
///
/// # Examples
///
/// ```
/// use tempora::{Statement, StoreConfig, TemporalStore, Term, TimeInstant, TimeSpan};
///
/// let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
/// let fifties = TimeSpan::between(TimeInstant::year(1950).unwrap(), TimeInstant::year(1960).unwrap()).unwrap();
/// store.add(Some(&fifties), Statement::type_assertion("http://ex/X", "http://ex/Building")).unwrap();
/// store.add(None, Statement::new("http://ex/X", "http://purl.org/dc/terms/title", Term::literal("Old Hall"))).unwrap();
///
/// assert_eq!(store.snapshot_at(&TimeInstant::year(1955).unwrap()).unwrap().len(), 2);
/// assert_eq!(store.snapshot_at(&TimeInstant::year(1970).unwrap()).unwrap().len(), 1);
/// ```
#[derive(Clone)]
pub struct TemporalStore {
    inner: Arc<StoreInner>,
}

impl TemporalStore {
    /// Opens a store over `backend` with random UUID ids.
    ///
    /// Creates the global and metadata containers if missing, rebuilds the
    /// partition table from the metadata records and, when
    /// `index_time_dimension` is set, builds the time index.
    ///
    /// # Errors
    ///
    /// Propagates storage errors, and `IncoherentData` for malformed metadata.
    pub fn open(config: StoreConfig, backend: Arc<dyn StatementStore>) -> TemporaResult<Self> {
        Self::open_with_allocator(config, backend, Box::new(UuidAllocator))
    }

    /// Opens a store over a fresh in-memory backend.
    ///
    /// # Errors
    ///
    /// See [`TemporalStore::open`].
    pub fn in_memory(config: StoreConfig) -> TemporaResult<Self> {
        Self::open(config, Arc::new(InMemoryStatementStore::new()))
    }

    /// Opens a store using `ids` for [`TemporalStore::generate_id_uri`].
    ///
    /// # Errors
    ///
    /// See [`TemporalStore::open`].
    pub fn open_with_allocator(
        config: StoreConfig,
        backend: Arc<dyn StatementStore>,
        ids: Box<dyn IdAllocator>,
    ) -> TemporaResult<Self> {
        let global = config.global_container();
        let metadata = config.metadata_container();
        let mut existing: HashSet<ContainerId> = backend.list_containers()?.into_iter().collect();
        for container in [&global, &metadata] {
            if existing.insert(container.clone()) {
                backend.create_container(container)?;
            }
        }

        let statements = backend
            .match_statements(Some(&metadata), &StatementPattern::any())?
            .into_iter()
            .map(|quad| quad.statement);
        let mut state = StoreState::default();
        for (id, span) in record::decode_all(statements, &metadata)? {
            if existing.insert(id.clone()) {
                backend.create_container(&id)?;
            }
            state.partitions.insert(id, span);
        }
        if config.index_time_dimension {
            state.index.build_from(state.partitions.iter().map(|(id, span)| (id.clone(), span)));
        }
        debug!(
            partitions = state.partitions.len(),
            indexed = state.index.is_built(),
            "temporal store opened"
        );

        let bus = UpdateBus::new(config.update_stream_capacity);
        Ok(Self {
            inner: Arc::new(StoreInner {
                config,
                backend,
                global,
                metadata,
                mutation: Mutex::new(()),
                state: RwLock::new(state),
                bus,
                ids,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// The update bus listeners attach to.
    #[must_use]
    pub fn updates(&self) -> &UpdateBus {
        &self.inner.bus
    }

    /// Id of the container holding time-invariant statements.
    #[must_use]
    pub fn global_container(&self) -> &ContainerId {
        &self.inner.global
    }

    /// Id of the container holding partition metadata records.
    #[must_use]
    pub fn metadata_container(&self) -> &ContainerId {
        &self.inner.metadata
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Adds a statement valid during `timespan`.
    ///
    /// `None` and the existence span store to the global container. Otherwise
    /// the statement goes to the partition for the span's canonical form,
    /// created (with its metadata record and index entry) on first use.
    ///
    /// Returns the partition used, or `None` for the global container.
    ///
    /// # Errors
    ///
    /// Returns `ReentrantMutation` from inside an update listener, validation
    /// errors for malformed statements, and storage errors.
    pub fn add(&self, timespan: Option<&TimeSpan>, statement: Statement) -> TemporaResult<Option<ContainerId>> {
        self.add_all(timespan, vec![statement])
    }

    /// Adds a time-invariant statement.
    ///
    /// # Errors
    ///
    /// See [`TemporalStore::add`].
    pub fn add_global(&self, statement: Statement) -> TemporaResult<()> {
        self.add(None, statement).map(|_| ())
    }

    /// Adds several statements under one span as a single mutation.
    ///
    /// Listeners see one insertion event per statement that was not already
    /// present.
    ///
    /// # Errors
    ///
    /// See [`TemporalStore::add`]. Nothing is written if any statement is
    /// malformed.
    pub fn add_all(
        &self,
        timespan: Option<&TimeSpan>,
        statements: Vec<Statement>,
    ) -> TemporaResult<Option<ContainerId>> {
        self.write_batch(vec![(Scope::of(timespan)?, statements)], Existing::Ignore)
    }

    /// Removes a statement from the scope of `timespan`.
    ///
    /// Removing from a partition that does not exist is a no-op. Returns
    /// whether a statement was removed.
    ///
    /// # Errors
    ///
    /// Returns `ReentrantMutation` from inside an update listener, and storage
    /// errors.
    pub fn remove(&self, timespan: Option<&TimeSpan>, statement: &Statement) -> TemporaResult<bool> {
        let scope = Scope::of(timespan)?;
        let _mutation = self.begin_mutation()?;

        let event = {
            let state = self.write_state()?;
            let (container, span) = match scope {
                Scope::Global => (self.inner.global.clone(), None),
                Scope::Partition(span) => {
                    let id = self.inner.config.partition_id(&span);
                    if !state.partitions.contains_key(&id) {
                        return Ok(false);
                    }
                    (id, Some(span))
                }
            };
            self.inner
                .backend
                .remove(&container, statement)?
                .then(|| UpdateEvent::remove(span, statement.clone(), container))
        };

        let removed = event.is_some();
        if let Some(event) = event {
            self.inner.bus.publish(&[event]);
        }
        Ok(removed)
    }

    /// Removes a time-invariant statement.
    ///
    /// # Errors
    ///
    /// See [`TemporalStore::remove`].
    pub fn remove_global(&self, statement: &Statement) -> TemporaResult<bool> {
        self.remove(None, statement)
    }

    /// Removes every statement whose subject is `uri`, in every partition and
    /// the global container, emitting one removal event per statement.
    ///
    /// Returns the number of statements removed.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if `uri` has no type assertion.
    pub fn purge(&self, uri: &str) -> TemporaResult<usize> {
        let _mutation = self.begin_mutation()?;

        let mut events = Vec::new();
        {
            let state = self.write_state()?;
            if !self.has_type_assertion(&state, uri)? {
                return Err(TemporaError::entity_not_found(uri));
            }
            self.purge_locked(&state, uri, &mut events)?;
        }

        let removed = events.len();
        self.inner.bus.publish(&events);
        Ok(removed)
    }

    /// Writes an entity's statements under `timespan`.
    ///
    /// # Errors
    ///
    /// Returns `EntityAlreadyExists` if the entity's URI already has a type
    /// assertion, plus everything [`TemporalStore::add`] returns.
    pub fn add_entity(
        &self,
        timespan: Option<&TimeSpan>,
        entity: &Entity,
        schema: &SchemaRegistry,
    ) -> TemporaResult<Option<ContainerId>> {
        let writes = vec![(Scope::of(timespan)?, entity.to_statements(schema))];
        self.write_batch(writes, Existing::Reject(entity.uri()))
    }

    /// Replaces whatever is stored about the entity with its current state,
    /// as one mutation: readers and listeners see either the old entity or the
    /// new one. A missing entity is simply added.
    ///
    /// # Errors
    ///
    /// See [`TemporalStore::add`].
    pub fn change_entity(
        &self,
        timespan: Option<&TimeSpan>,
        entity: &Entity,
        schema: &SchemaRegistry,
    ) -> TemporaResult<Option<ContainerId>> {
        let writes = vec![(Scope::of(timespan)?, entity.to_statements(schema))];
        self.write_batch(writes, Existing::Replace(entity.uri()))
    }

    /// Writes a time-based entity: its type assertion under the lifetime, and
    /// each version's statements under that version's span.
    ///
    /// # Errors
    ///
    /// Returns `EntityAlreadyExists` if the URI already has a type assertion,
    /// plus everything [`TemporalStore::add`] returns.
    pub fn add_entity_over_time(&self, entity: &TimeBasedEntity, schema: &SchemaRegistry) -> TemporaResult<()> {
        self.write_batch(versioned_writes(entity, schema)?, Existing::Reject(entity.uri()))
            .map(|_| ())
    }

    /// Replaces everything stored about a time-based entity, as one mutation.
    ///
    /// # Errors
    ///
    /// See [`TemporalStore::add`].
    pub fn change_entity_over_time(&self, entity: &TimeBasedEntity, schema: &SchemaRegistry) -> TemporaResult<()> {
        self.write_batch(versioned_writes(entity, schema)?, Existing::Replace(entity.uri()))
            .map(|_| ())
    }

    /// Rescans the metadata container and replaces the time index.
    ///
    /// Returns the number of indexed partitions.
    ///
    /// # Errors
    ///
    /// Propagates storage errors and `IncoherentData` for malformed records.
    pub fn rebuild_time_index(&self) -> TemporaResult<usize> {
        let _mutation = self.begin_mutation()?;
        let mut state = self.write_state()?;
        state.index.build(self.inner.backend.as_ref(), &self.inner.metadata)
    }

    // ------------------------------------------------------------------
    // Entity and resource queries
    // ------------------------------------------------------------------

    /// True iff some container holds a type assertion about `uri`.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn contains_entity(&self, uri: &str) -> TemporaResult<bool> {
        let state = self.read_state()?;
        self.has_type_assertion(&state, uri)
    }

    /// True iff `uri` is the subject of any statement.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn contains_resource(&self, uri: &str) -> TemporaResult<bool> {
        let state = self.read_state()?;
        self.any_data_match(&state, &StatementPattern::any().subject(resource_term(uri)))
    }

    /// The span of the container holding `uri`'s type assertion.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` without a type assertion, and `IncoherentData`
    /// when type assertions sit in more than one container.
    pub fn entity_lifetime(&self, uri: &str) -> TemporaResult<TimeSpan> {
        let state = self.read_state()?;
        self.lifetime_locked(&state, uri)
    }

    /// The IRI of `uri`'s unique type.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` without a type assertion, and `IncoherentData`
    /// for more than one type or a type that is not an IRI.
    pub fn type_of(&self, uri: &str) -> TemporaResult<String> {
        let _state = self.read_state()?;
        self.type_locked(uri)
    }

    /// Loads an entity with its whole value history.
    ///
    /// Every partition overlapping the entity's lifetime contributes the
    /// entity's statements, valid during the overlap; the global container
    /// contributes for the whole lifetime. Where contributions overlap, the
    /// narrower span wins.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` without a type assertion, and `IncoherentData`
    /// for conflicting type assertions.
    pub fn entity_over_time(&self, uri: &str, schema: &SchemaRegistry) -> TemporaResult<TimeBasedEntity> {
        let state = self.read_state()?;
        let lifetime = self.lifetime_locked(&state, uri)?;
        let type_iri = self.type_locked(uri)?;

        let subject = StatementPattern::any().subject(resource_term(uri));
        let mut fragments = Vec::new();
        for container in self.data_containers(&state) {
            let span = if container == &self.inner.global {
                lifetime
            } else {
                match state.partitions.get(container).and_then(|span| span.intersection(&lifetime)) {
                    Some(span) => span,
                    None => continue,
                }
            };
            let quads = self.inner.backend.match_statements(Some(container), &subject)?;
            let mut statements: Vec<&Statement> = quads
                .iter()
                .map(|quad| &quad.statement)
                .filter(|stmt| !stmt.is_type_assertion())
                .collect();
            if statements.is_empty() {
                continue;
            }
            statements.sort();
            fragments.push((span, materialize(uri, type_iri.clone(), &statements, schema)));
        }
        drop(state);

        fragments.sort_by(|(a, _), (b, _)| width(b).cmp(&width(a)).then_with(|| a.day_bounds().0.cmp(&b.day_bounds().0)));
        let mut entity = TimeBasedEntity::new(uri, type_iri, lifetime);
        for (span, fragment) in &fragments {
            entity.assign_fragment(*span, fragment)?;
        }
        debug!(uri, fragments = fragments.len(), "entity loaded over time");
        Ok(entity)
    }

    /// The entity as it was at `instant`.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if nothing is recorded about `uri` at
    /// `instant`, and `IncoherentData` for conflicting type assertions.
    pub fn entity_at(&self, uri: &str, instant: &TimeInstant, schema: Arc<SchemaRegistry>) -> TemporaResult<Entity> {
        self.snapshot_at(instant)?.load_entity(uri, schema)
    }

    fn lifetime_locked(&self, state: &StoreState, uri: &str) -> TemporaResult<TimeSpan> {
        let quads = self.type_quads(uri)?;
        let containers: BTreeSet<&ContainerId> = quads.iter().map(|q| &q.container).collect();
        match containers.len() {
            0 => Err(TemporaError::entity_not_found(uri)),
            1 => Ok(quads
                .first()
                .and_then(|q| state.partitions.get(&q.container).copied())
                .unwrap_or_else(TimeSpan::existence)),
            _ => Err(incoherent(uri, "type assertions in more than one container", &containers)),
        }
    }

    fn type_locked(&self, uri: &str) -> TemporaResult<String> {
        let quads = self.type_quads(uri)?;
        let containers: BTreeSet<&ContainerId> = quads.iter().map(|q| &q.container).collect();
        let types: BTreeSet<&Term> = quads.iter().map(|q| &q.statement.object).collect();
        let mut types = types.into_iter();
        match (types.next(), types.next()) {
            (None, _) => Err(TemporaError::entity_not_found(uri)),
            (Some(_), Some(_)) => Err(incoherent(uri, "more than one type assertion", &containers)),
            (Some(Term::Iri(type_iri)), None) => Ok(type_iri.clone()),
            (Some(other), None) => Err(incoherent(uri, &format!("type {other} is not an IRI"), &containers)),
        }
    }

    /// Subjects of statements with `predicate` (and `object`, when given),
    /// across every partition and the global container. Sorted, deduplicated.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn entity_uris_with(&self, predicate: &str, object: Option<&Term>) -> TemporaResult<Vec<String>> {
        let _state = self.read_state()?;
        let mut pattern = StatementPattern::any().predicate(predicate);
        if let Some(object) = object {
            pattern = pattern.object(object.clone());
        }
        let uris: BTreeSet<String> = self
            .data_quads(&pattern)?
            .into_iter()
            .filter_map(|q| q.statement.subject.resource_key())
            .collect();
        Ok(uris.into_iter().collect())
    }

    /// A URI in the data namespace that no statement uses as subject yet.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the allocator keeps producing used ids.
    pub fn generate_id_uri(&self) -> TemporaResult<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = format!("{}{}", self.inner.config.data_namespace, self.inner.ids.next_id());
            if !self.contains_resource(&candidate)? {
                return Ok(candidate);
            }
        }
        Err(TemporaError::internal(format!(
            "no free id in {} after {MAX_ID_ATTEMPTS} attempts",
            self.inner.config.data_namespace
        )))
    }

    // ------------------------------------------------------------------
    // Partitions and the time index
    // ------------------------------------------------------------------

    /// The container id `timespan` maps to, whether or not it exists yet.
    /// `None` for the global scope.
    #[must_use]
    pub fn partition_id(&self, timespan: &TimeSpan) -> Option<ContainerId> {
        match Scope::of(Some(timespan)) {
            Ok(Scope::Partition(span)) => Some(self.inner.config.partition_id(&span)),
            Ok(Scope::Global) | Err(_) => None,
        }
    }

    /// True if a partition exists for `timespan`.
    ///
    /// # Errors
    ///
    /// Returns an error on a poisoned lock.
    pub fn contains_partition(&self, timespan: &TimeSpan) -> TemporaResult<bool> {
        let state = self.read_state()?;
        Ok(self
            .partition_id(timespan)
            .is_some_and(|id| state.partitions.contains_key(&id)))
    }

    /// A copy of the statements in the partition for `timespan`, or `None`
    /// if it does not exist.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn partition(&self, timespan: &TimeSpan) -> TemporaResult<Option<Graph>> {
        let state = self.read_state()?;
        let Some(id) = self.partition_id(timespan).filter(|id| state.partitions.contains_key(id)) else {
            return Ok(None);
        };
        let quads = self.inner.backend.match_statements(Some(&id), &StatementPattern::any())?;
        Ok(Some(quads.into_iter().map(|q| q.statement).collect()))
    }

    /// Every partition and its canonical span, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error on a poisoned lock.
    pub fn partitions(&self) -> TemporaResult<Vec<(ContainerId, TimeSpan)>> {
        let state = self.read_state()?;
        let sorted: BTreeMap<&ContainerId, &TimeSpan> = state.partitions.iter().collect();
        Ok(sorted.into_iter().map(|(id, span)| (id.clone(), *span)).collect())
    }

    /// True once the time index has been built.
    ///
    /// # Errors
    ///
    /// Returns an error on a poisoned lock.
    pub fn is_time_indexed(&self) -> TemporaResult<bool> {
        Ok(self.read_state()?.index.is_built())
    }

    /// Partitions valid at `instant`, from the time index.
    ///
    /// # Errors
    ///
    /// Returns `NoIndexAvailable` if the index has not been built.
    pub fn graphs_for_instant(&self, instant: &TimeInstant) -> TemporaResult<Vec<ContainerId>> {
        self.read_state()?.index.graphs_for_instant(instant)
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Every statement valid at `instant`, merged with the global container.
    ///
    /// Uses the time index when built; otherwise falls back to checking each
    /// partition's span.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn snapshot_at(&self, instant: &TimeInstant) -> TemporaResult<Snapshot> {
        let state = self.read_state()?;
        let ids = if state.index.is_built() {
            state.index.graphs_for_instant(instant)?
        } else {
            let mut ids: Vec<ContainerId> = state
                .partitions
                .iter()
                .filter(|(_, span)| span.contains(*instant))
                .map(|(id, _)| id.clone())
                .collect();
            ids.sort();
            ids
        };
        self.assemble(&state, ids)
    }

    /// The named partitions merged with the global container.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPartition` for an id that is neither a partition nor
    /// the global container.
    pub fn snapshot_of(&self, ids: &[ContainerId]) -> TemporaResult<Snapshot> {
        let state = self.read_state()?;
        let mut chosen = Vec::with_capacity(ids.len());
        for id in ids {
            if id == &self.inner.global {
                continue;
            }
            if !state.partitions.contains_key(id) {
                return Err(ExecutionError::UnknownPartition { id: id.to_string() }.into());
            }
            if !chosen.contains(id) {
                chosen.push(id.clone());
            }
        }
        self.assemble(&state, chosen)
    }

    /// Every partition merged with the global container.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn snapshot_all(&self) -> TemporaResult<Snapshot> {
        let state = self.read_state()?;
        let mut ids: Vec<ContainerId> = state.partitions.keys().cloned().collect();
        ids.sort();
        self.assemble(&state, ids)
    }

    fn assemble(&self, _state: &RwLockReadGuard<'_, StoreState>, ids: Vec<ContainerId>) -> TemporaResult<Snapshot> {
        let mut graph = Graph::new();
        for id in ids.iter().chain(std::iter::once(&self.inner.global)) {
            for quad in self.inner.backend.match_statements(Some(id), &StatementPattern::any())? {
                graph.insert(quad.statement);
            }
        }
        debug!(partitions = ids.len(), statements = graph.len(), "snapshot assembled");
        Ok(Snapshot::new(self.clone(), graph, ids))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Applies `writes` as one mutation, after validating every statement.
    /// Returns the container of the first write when it is a partition.
    fn write_batch(
        &self,
        writes: Vec<(Scope, Vec<Statement>)>,
        existing: Existing<'_>,
    ) -> TemporaResult<Option<ContainerId>> {
        for statement in writes.iter().flat_map(|(_, statements)| statements) {
            statement.validate()?;
        }
        let _mutation = self.begin_mutation()?;

        let mut events = Vec::new();
        let mut first = None;
        {
            let mut state = self.write_state()?;
            match existing {
                Existing::Ignore => {}
                Existing::Reject(uri) => {
                    if self.has_type_assertion(&state, uri)? {
                        return Err(ExecutionError::EntityAlreadyExists { uri: uri.to_string() }.into());
                    }
                }
                Existing::Replace(uri) => {
                    if self.has_type_assertion(&state, uri)? {
                        self.purge_locked(&state, uri, &mut events)?;
                    }
                }
            }
            for (n, (scope, statements)) in writes.into_iter().enumerate() {
                let partition = self.insert_locked(&mut state, scope, statements, &mut events)?;
                if n == 0 {
                    first = partition;
                }
            }
        }

        self.inner.bus.publish(&events);
        Ok(first)
    }

    /// Inserts into the container for `scope`, creating a partition on first
    /// use. Returns the partition, or `None` for the global container.
    fn insert_locked(
        &self,
        state: &mut StoreState,
        scope: Scope,
        statements: Vec<Statement>,
        events: &mut Vec<UpdateEvent>,
    ) -> TemporaResult<Option<ContainerId>> {
        let (container, span) = match scope {
            Scope::Global => (self.inner.global.clone(), None),
            Scope::Partition(span) => (self.ensure_partition(state, &span)?, Some(span)),
        };
        for statement in statements {
            if self.inner.backend.insert(&container, statement.clone())? {
                events.push(UpdateEvent::insert(span, statement, container.clone()));
            }
        }
        Ok(span.map(|_| container))
    }

    /// Removes every statement about `uri` from the data containers.
    fn purge_locked(&self, state: &StoreState, uri: &str, events: &mut Vec<UpdateEvent>) -> TemporaResult<()> {
        let pattern = StatementPattern::any().subject(resource_term(uri));
        let before = events.len();
        for quad in self.data_quads(&pattern)? {
            let span = state.partitions.get(&quad.container).copied();
            if self.inner.backend.remove(&quad.container, &quad.statement)? {
                events.push(UpdateEvent::remove(span, quad.statement, quad.container));
            }
        }
        debug!(uri, removed = events.len() - before, "entity purged");
        Ok(())
    }

    fn begin_mutation(&self) -> TemporaResult<MutexGuard<'_, ()>> {
        if is_dispatching() {
            return Err(ExecutionError::ReentrantMutation.into());
        }
        Ok(self.inner.mutation.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn read_state(&self) -> TemporaResult<RwLockReadGuard<'_, StoreState>> {
        self.inner.state.read().map_err(|_| lock_err("store.state"))
    }

    fn write_state(&self) -> TemporaResult<RwLockWriteGuard<'_, StoreState>> {
        self.inner.state.write().map_err(|_| lock_err("store.state"))
    }

    /// Creates the partition for a canonical span if needed, writing its
    /// metadata record and index entry before returning.
    fn ensure_partition(&self, state: &mut StoreState, span: &TimeSpan) -> TemporaResult<ContainerId> {
        let id = self.inner.config.partition_id(span);
        if state.partitions.contains_key(&id) {
            return Ok(id);
        }
        let backend = &self.inner.backend;
        if !backend.container_exists(&id)? {
            backend.create_container(&id)?;
        }
        for stmt in record::encode(&id, span) {
            backend.insert(&self.inner.metadata, stmt)?;
        }
        if state.index.is_built() {
            state.index.add(id.clone(), span);
        }
        state.partitions.insert(id.clone(), *span);
        debug!(partition = %id, span = %span, "partition created");
        Ok(id)
    }

    /// Matches over the global container and every partition, never the
    /// metadata container.
    fn data_quads(&self, pattern: &StatementPattern) -> TemporaResult<Vec<Quad>> {
        let quads = self.inner.backend.match_statements(None, pattern)?;
        Ok(quads
            .into_iter()
            .filter(|q| q.container != self.inner.metadata)
            .collect())
    }

    fn type_quads(&self, uri: &str) -> TemporaResult<Vec<Quad>> {
        let pattern = StatementPattern::any().subject(resource_term(uri)).predicate(rdf::TYPE);
        self.data_quads(&pattern)
    }

    /// The global container, then every partition.
    fn data_containers<'a>(&'a self, state: &'a StoreState) -> impl Iterator<Item = &'a ContainerId> + 'a {
        std::iter::once(&self.inner.global).chain(state.partitions.keys())
    }

    /// True if any data container holds a match; stops at the first hit.
    fn any_data_match(&self, state: &StoreState, pattern: &StatementPattern) -> TemporaResult<bool> {
        for container in self.data_containers(state) {
            if self.inner.backend.contains_match(Some(container), pattern)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn has_type_assertion(&self, state: &StoreState, uri: &str) -> TemporaResult<bool> {
        let pattern = StatementPattern::any().subject(resource_term(uri)).predicate(rdf::TYPE);
        self.any_data_match(state, &pattern)
    }
}

/// The type assertion under the lifetime, then each version's other
/// statements under the version's span.
fn versioned_writes(entity: &TimeBasedEntity, schema: &SchemaRegistry) -> TemporaResult<Vec<(Scope, Vec<Statement>)>> {
    let type_assertion = Statement::new(resource_term(entity.uri()), rdf::TYPE, Term::iri(entity.type_iri()));
    let mut writes = vec![(Scope::of(Some(entity.lifetime()))?, vec![type_assertion])];
    for version in entity.versions() {
        let statements: Vec<Statement> = version
            .entity()
            .to_statements(schema)
            .into_iter()
            .filter(|stmt| !stmt.is_type_assertion())
            .collect();
        if !statements.is_empty() {
            writes.push((Scope::of(Some(version.span()))?, statements));
        }
    }
    Ok(writes)
}

/// Days covered, open-ended spans widest.
fn width(span: &TimeSpan) -> i64 {
    let (lower, upper) = span.day_bounds();
    upper.unwrap_or(i64::MAX).saturating_sub(lower)
}

fn incoherent(uri: &str, reason: &str, containers: &BTreeSet<&ContainerId>) -> TemporaError {
    let partitions: Vec<String> = containers.iter().map(ToString::to_string).collect();
    warn!(uri, ?partitions, reason, "incoherent data");
    TemporaError::incoherent(uri, reason, partitions)
}

impl std::fmt::Debug for TemporalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalStore")
            .field("config", &self.inner.config)
            .field("bus", &self.inner.bus)
            .finish_non_exhaustive()
    }
}
