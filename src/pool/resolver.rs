//! Single-pass entity materialization with deferred linking.
//!
//! Resources are admitted from a work queue. Each admitted resource becomes
//! one entity in an arena; its references either resolve immediately (target
//! already built) or wait in `pending` keyed by target until the target is
//! inserted. Cycles terminate because a resource is queued at most once.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use crate::error::{TemporaError, TemporaResult};
use crate::pool::config::PoolConfig;
use crate::pool::entity::{Entity, Link, UnresolvedLink};
use crate::pool::schema::{PropertyKind, SchemaRegistry};
use crate::pool::PoolStats;
use crate::statement::{resource_term, Statement, StatementPattern, Term};
use crate::storage::Graph;
use crate::value::{LiteralKind, Value};
use crate::vocab::rdf;

pub(crate) struct Resolved {
    pub(crate) slots: Vec<Option<Entity>>,
    pub(crate) by_uri: HashMap<String, usize>,
    pub(crate) unresolved: Vec<UnresolvedLink>,
    pub(crate) stats: PoolStats,
}

struct Pending {
    source: usize,
    slot: String,
    idx: usize,
}

struct Resolver<'a> {
    graph: &'a Graph,
    config: &'a PoolConfig,
    schema: &'a SchemaRegistry,
    slots: Vec<Option<Entity>>,
    by_uri: HashMap<String, usize>,
    pending: HashMap<String, Vec<Pending>>,
    queue: VecDeque<String>,
    seen: HashSet<String>,
    stats: PoolStats,
}

pub(crate) fn resolve(graph: &Graph, config: &PoolConfig) -> TemporaResult<Resolved> {
    let mut resolver = Resolver {
        graph,
        config,
        schema: config.schema_registry(),
        slots: Vec::new(),
        by_uri: HashMap::new(),
        pending: HashMap::new(),
        queue: VecDeque::new(),
        seen: HashSet::new(),
        stats: PoolStats::default(),
    };

    for seed in resolver.seeds() {
        resolver.enqueue(seed);
    }
    while let Some(uri) = resolver.queue.pop_front() {
        resolver.admit(&uri)?;
    }
    resolver.apply_entity_filters();
    Ok(resolver.finish())
}

impl Resolver<'_> {
    fn seeds(&self) -> Vec<String> {
        if let Some(seeds) = self.config.seed_uris() {
            return seeds.to_vec();
        }
        let typed = StatementPattern::any().predicate(rdf::TYPE);
        let subjects: BTreeSet<String> = self
            .graph
            .matching(&typed)
            .filter(|stmt| stmt.object.as_iri().is_some_and(|t| self.config.accepts_type(t)))
            .filter_map(|stmt| stmt.subject.resource_key())
            .collect();
        subjects.into_iter().collect()
    }

    fn enqueue(&mut self, uri: String) {
        if self.seen.insert(uri.clone()) {
            self.queue.push_back(uri);
        }
    }

    fn admit(&mut self, uri: &str) -> TemporaResult<()> {
        self.stats.visited += 1;
        let graph = self.graph;
        let pattern = StatementPattern::any().subject(resource_term(uri));
        let mut statements: Vec<&Statement> = graph.matching(&pattern).collect();
        statements.sort();

        let Some(type_iri) = Self::type_of(uri, &statements)? else {
            self.stats.untyped += 1;
            trace!(uri, "resource has no type assertion; skipped");
            return Ok(());
        };
        if !self.config.accepts_type(&type_iri) {
            self.stats.rejected_by_type += 1;
            trace!(uri, type_iri = %type_iri, "type not accepted");
            return Ok(());
        }
        if !self.config.resource_filters().iter().all(|f| f.accepts(uri, &statements)) {
            self.stats.rejected_by_resource_filter += 1;
            trace!(uri, "rejected by resource filter");
            return Ok(());
        }

        let entity = materialize(uri, type_iri, &statements, self.schema);
        self.insert(entity);
        Ok(())
    }

    fn type_of(uri: &str, statements: &[&Statement]) -> TemporaResult<Option<String>> {
        let types: BTreeSet<&Term> = statements
            .iter()
            .filter(|stmt| stmt.is_type_assertion())
            .map(|stmt| &stmt.object)
            .collect();
        match types.len() {
            0 => Ok(None),
            1 => types
                .first()
                .and_then(|t| t.as_iri())
                .map(|t| Some(t.to_string()))
                .ok_or_else(|| TemporaError::incoherent(uri, "type object is not an IRI", Vec::new())),
            _ => {
                let listed: Vec<String> = types.iter().map(ToString::to_string).collect();
                Err(TemporaError::incoherent(
                    uri,
                    format!("resource has {} types: {}", listed.len(), listed.join(", ")),
                    Vec::new(),
                ))
            }
        }
    }

    fn insert(&mut self, entity: Entity) {
        let handle = self.slots.len();
        let uri = entity.uri().to_string();
        let mut outgoing = Vec::new();
        for slot in entity.reference_slots() {
            for (idx, link) in entity.links(slot).iter().enumerate() {
                outgoing.push((slot.to_string(), idx, link.target().to_string()));
            }
        }

        self.slots.push(Some(entity));
        self.by_uri.insert(uri.clone(), handle);
        self.stats.constructed += 1;

        for (slot, idx, target) in outgoing {
            if let Some(&existing) = self.by_uri.get(&target) {
                self.link(handle, &slot, idx, existing);
                continue;
            }
            self.pending.entry(target.clone()).or_default().push(Pending {
                source: handle,
                slot,
                idx,
            });
            if self.config.follows_references() {
                self.enqueue(target);
            }
        }

        if let Some(waiting) = self.pending.remove(&uri) {
            for p in waiting {
                self.link(p.source, &p.slot, p.idx, handle);
            }
        }
    }

    fn link(&mut self, source: usize, slot: &str, idx: usize, target: usize) {
        if let Some(Some(entity)) = self.slots.get_mut(source) {
            entity.resolve_link(slot, idx, target);
        }
    }

    fn apply_entity_filters(&mut self) {
        let config = self.config;
        let filters = config.entity_filters();
        if filters.is_empty() {
            return;
        }
        let rejected: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(handle, slot)| {
                let entity = slot.as_ref()?;
                (!filters.iter().all(|f| f.accepts(entity))).then_some(handle)
            })
            .collect();
        if rejected.is_empty() {
            return;
        }

        for &handle in &rejected {
            if let Some(entity) = self.slots.get_mut(handle).and_then(Option::take) {
                trace!(uri = entity.uri(), "rejected by entity filter");
                self.by_uri.remove(entity.uri());
            }
        }
        for entity in self.slots.iter_mut().flatten() {
            entity.unresolve(&rejected);
        }
        self.stats.rejected_by_entity_filter = rejected.len();
    }

    fn finish(mut self) -> Resolved {
        let mut unresolved = Vec::new();
        for entity in self.slots.iter().flatten() {
            for (slot, link) in entity.all_links() {
                if link.is_resolved() {
                    self.stats.resolved_links += 1;
                } else {
                    unresolved.push(UnresolvedLink {
                        source: entity.uri().to_string(),
                        slot: slot.to_string(),
                        target: link.target().to_string(),
                    });
                }
            }
        }
        self.stats.unresolved_links = unresolved.len();
        self.stats.entities = self.by_uri.len();
        debug!(
            entities = self.stats.entities,
            visited = self.stats.visited,
            resolved = self.stats.resolved_links,
            unresolved = self.stats.unresolved_links,
            "entity pool built"
        );
        Resolved {
            slots: self.slots,
            by_uri: self.by_uri,
            unresolved,
            stats: self.stats,
        }
    }
}

/// Builds an entity from its statements through `schema`, or generically when
/// the type has no schema. Slot contents follow the order of `statements`.
pub(crate) fn materialize(uri: &str, type_iri: String, statements: &[&Statement], schema: &SchemaRegistry) -> Entity {
    let schema = schema.get(&type_iri);
    let mut entity = Entity::new(uri, type_iri);
    for stmt in statements.iter().filter(|stmt| !stmt.is_type_assertion()) {
        match schema {
            Some(schema) => {
                let Some(spec) = schema.for_predicate(&stmt.predicate) else {
                    continue;
                };
                match spec.kind {
                    PropertyKind::Literal(kind) => push_literal(&mut entity, &spec.name, kind, stmt),
                    PropertyKind::Reference => push_reference(&mut entity, &spec.name, stmt),
                    PropertyKind::Passive => {}
                }
            }
            None if stmt.object.is_literal() => {
                push_literal(&mut entity, &stmt.predicate, LiteralKind::Auto, stmt);
            }
            None => push_reference(&mut entity, &stmt.predicate, stmt),
        }
    }
    entity
}

fn push_literal(entity: &mut Entity, slot: &str, kind: LiteralKind, stmt: &Statement) {
    match stmt.object.as_literal().and_then(|literal| Value::decode(kind, literal)) {
        Some(value) => entity.push_literal(slot.to_string(), value),
        None => trace!(uri = entity.uri(), predicate = %stmt.predicate, "literal did not decode; skipped"),
    }
}

fn push_reference(entity: &mut Entity, slot: &str, stmt: &Statement) {
    match stmt.object.resource_key() {
        Some(target) => {
            entity.push_link(slot.to_string(), Link::new(stmt.predicate.clone(), target));
        }
        None => trace!(uri = entity.uri(), predicate = %stmt.predicate, "literal in reference slot; skipped"),
    }
}
