//! Materialized entities and their reference slots.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pool::schema::SchemaRegistry;
use crate::statement::{resource_term, Statement, Term};
use crate::value::Value;
use crate::vocab::rdf;

/// One object-property value: a target resource and, once both ends are in the
/// same pool, the target's handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    predicate: String,
    target: String,
    #[serde(skip)]
    pub(crate) resolved: Option<usize>,
}

impl Link {
    pub(crate) fn new(predicate: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
            target: target.into(),
            resolved: None,
        }
    }

    /// The predicate the link was read from; the slot name on hand-built
    /// entities.
    #[must_use]
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// The target resource key (an IRI, or `_:label` for a blank node).
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

/// A link whose target was never constructed in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnresolvedLink {
    pub source: String,
    pub slot: String,
    pub target: String,
}

impl fmt::Display for UnresolvedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}", self.source, self.slot, self.target)
    }
}

/// A typed view of one resource's statements.
///
/// Entities built by hand (to write through
/// [`TemporalStore::add_entity`](crate::TemporalStore::add_entity)) use slot
/// names from the type's schema, or predicate IRIs for generic types.
///
/// # Examples
///
/// ```
/// use tempora::{Entity, SchemaRegistry, Value};
///
/// let hall = Entity::new("http://ex/hall", "http://ex/Building")
///     .with_literal("http://purl.org/dc/terms/title", "Old Hall")
///     .with_reference("http://ex/architect", "http://ex/wren");
///
/// assert_eq!(hall.literal("http://purl.org/dc/terms/title"), Some(&Value::from("Old Hall")));
/// assert_eq!(hall.to_statements(&SchemaRegistry::new()).len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    uri: String,
    type_iri: String,
    literals: BTreeMap<String, Vec<Value>>,
    links: BTreeMap<String, Vec<Link>>,
}

impl Entity {
    #[must_use]
    pub fn new(uri: impl Into<String>, type_iri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            type_iri: type_iri.into(),
            literals: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_literal(mut self, slot: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_literal(slot.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_reference(mut self, slot: impl Into<String>, target: impl Into<String>) -> Self {
        let slot = slot.into();
        let link = Link::new(slot.clone(), target);
        self.push_link(slot, link);
        self
    }

    pub(crate) fn push_literal(&mut self, slot: String, value: Value) {
        self.literals.entry(slot).or_default().push(value);
    }

    /// Returns the link's index within its slot.
    pub(crate) fn push_link(&mut self, slot: String, link: Link) {
        self.links.entry(slot).or_default().push(link);
    }

    pub(crate) fn resolve_link(&mut self, slot: &str, idx: usize, handle: usize) {
        if let Some(link) = self.links.get_mut(slot).and_then(|links| links.get_mut(idx)) {
            link.resolved = Some(handle);
        }
    }

    /// Clears every link resolved to one of `handles`.
    pub(crate) fn unresolve(&mut self, handles: &[usize]) {
        for link in self.links.values_mut().flatten() {
            if link.resolved.is_some_and(|h| handles.contains(&h)) {
                link.resolved = None;
            }
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn type_iri(&self) -> &str {
        &self.type_iri
    }

    /// The first value in `slot`.
    #[must_use]
    pub fn literal(&self, slot: &str) -> Option<&Value> {
        self.literals(slot).first()
    }

    /// Every value in `slot`. Entities from a pool hold them in term order.
    #[must_use]
    pub fn literals(&self, slot: &str) -> &[Value] {
        self.literals.get(slot).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn links(&self, slot: &str) -> &[Link] {
        self.links.get(slot).map_or(&[], Vec::as_slice)
    }

    /// Target keys of `slot`, resolved or not.
    #[must_use]
    pub fn reference_targets(&self, slot: &str) -> Vec<&str> {
        self.links(slot).iter().map(Link::target).collect()
    }

    pub fn literal_slots(&self) -> impl Iterator<Item = &str> {
        self.literals.keys().map(String::as_str)
    }

    pub fn reference_slots(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    pub(crate) fn all_links(&self) -> impl Iterator<Item = (&str, &Link)> {
        self.links
            .iter()
            .flat_map(|(slot, links)| links.iter().map(move |link| (slot.as_str(), link)))
    }

    /// Encodes the entity back into statements: its type assertion, one
    /// statement per literal, one per reference. Null literals are omitted.
    #[must_use]
    pub fn to_statements(&self, schema: &SchemaRegistry) -> Vec<Statement> {
        let subject = resource_term(&self.uri);
        let mut out = vec![Statement::new(subject.clone(), rdf::TYPE, Term::iri(self.type_iri.clone()))];
        for (slot, values) in &self.literals {
            let predicate = schema.predicate_for(&self.type_iri, slot);
            out.extend(
                values
                    .iter()
                    .filter_map(Value::to_term)
                    .map(|object| Statement::new(subject.clone(), predicate, object)),
            );
        }
        for (slot, links) in &self.links {
            let predicate = schema.predicate_for(&self.type_iri, slot);
            out.extend(
                links
                    .iter()
                    .map(|link| Statement::new(subject.clone(), predicate, resource_term(&link.target))),
            );
        }
        out
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> a <{}>", self.uri, self.type_iri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::pool::schema::EntitySchema;
    use crate::value::LiteralKind;

    #[test]
    fn encodes_through_the_schema() {
        let schema = SchemaRegistry::new().with(
            EntitySchema::new("http://ex/Person")
                .literal("name", "http://ex/name", LiteralKind::String)
                .reference("knows", "http://ex/knows"),
        );
        let person = Entity::new("http://ex/ada", "http://ex/Person")
            .with_literal("name", "Ada")
            .with_literal("name", Value::Null)
            .with_reference("knows", "_:b1");
        let statements = person.to_statements(&schema);
        assert_eq!(statements.len(), 3);
        assert!(statements.contains(&Statement::type_assertion("http://ex/ada", "http://ex/Person")));
        assert!(statements.contains(&Statement::new("http://ex/ada", "http://ex/name", Term::literal("Ada"))));
        assert!(statements.contains(&Statement::new("http://ex/ada", "http://ex/knows", Term::blank("b1"))));
    }

    #[test]
    fn unresolve_clears_only_matching_handles() {
        let mut entity = Entity::new("http://ex/a", "http://ex/T")
            .with_reference("p", "http://ex/b")
            .with_reference("p", "http://ex/c");
        entity.resolve_link("p", 0, 4);
        entity.resolve_link("p", 1, 7);
        entity.unresolve(&[4]);
        assert!(!entity.links("p")[0].is_resolved());
        assert!(entity.links("p")[1].is_resolved());
        assert_eq!(entity.reference_targets("p"), vec!["http://ex/b", "http://ex/c"]);
        assert!(entity.links("missing").is_empty());
    }
}
