//! Statically registered entity schemas.
//!
//! A schema maps one type IRI to a table of properties. Each property names a
//! slot on the entity, the predicate it is read from, and how the object is
//! interpreted. Types with no registered schema are materialized generically.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::LiteralKind;

/// How a property's statements become entity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "literal", rename_all = "snake_case")]
pub enum PropertyKind {
    /// The object is a literal decoded into a [`Value`](crate::Value).
    Literal(LiteralKind),
    /// The object is another resource.
    Reference,
    /// Reverse reference: other entities pointing at this one through the
    /// property's predicate. Never stored on the entity itself.
    Passive,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub predicate: String,
    pub kind: PropertyKind,
}

impl PropertySpec {
    #[must_use]
    pub const fn is_passive(&self) -> bool {
        matches!(self.kind, PropertyKind::Passive)
    }
}

/// Property table for one entity type.
///
/// # Examples
///
/// ```
/// use tempora::{EntitySchema, LiteralKind};
///
/// let building = EntitySchema::new("http://ex/Building")
///     .literal("title", "http://purl.org/dc/terms/title", LiteralKind::String)
///     .reference("architect", "http://ex/architect")
///     .passive("tenants", "http://ex/occupies");
///
/// assert_eq!(building.property("architect").unwrap().predicate, "http://ex/architect");
/// assert!(building.for_predicate("http://ex/occupies").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySchema {
    type_iri: String,
    properties: Vec<PropertySpec>,
    by_predicate: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl EntitySchema {
    #[must_use]
    pub fn new(type_iri: impl Into<String>) -> Self {
        Self {
            type_iri: type_iri.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn literal(self, name: impl Into<String>, predicate: impl Into<String>, kind: LiteralKind) -> Self {
        self.with_property(PropertySpec {
            name: name.into(),
            predicate: predicate.into(),
            kind: PropertyKind::Literal(kind),
        })
    }

    #[must_use]
    pub fn reference(self, name: impl Into<String>, predicate: impl Into<String>) -> Self {
        self.with_property(PropertySpec {
            name: name.into(),
            predicate: predicate.into(),
            kind: PropertyKind::Reference,
        })
    }

    /// `predicate` is read on the referring entities.
    #[must_use]
    pub fn passive(self, name: impl Into<String>, predicate: impl Into<String>) -> Self {
        self.with_property(PropertySpec {
            name: name.into(),
            predicate: predicate.into(),
            kind: PropertyKind::Passive,
        })
    }

    /// Adds `spec`, replacing any property with the same name.
    #[must_use]
    pub fn with_property(mut self, spec: PropertySpec) -> Self {
        if let Some(&idx) = self.by_name.get(&spec.name) {
            self.properties[idx] = spec;
        } else {
            self.properties.push(spec);
        }
        self.reindex();
        self
    }

    fn reindex(&mut self) {
        self.by_name.clear();
        self.by_predicate.clear();
        for (idx, spec) in self.properties.iter().enumerate() {
            self.by_name.insert(spec.name.clone(), idx);
            if !spec.is_passive() {
                self.by_predicate.entry(spec.predicate.clone()).or_insert(idx);
            }
        }
    }

    #[must_use]
    pub fn type_iri(&self) -> &str {
        &self.type_iri
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.by_name.get(name).map(|&idx| &self.properties[idx])
    }

    /// The stored (non-passive) property read from `predicate`.
    #[must_use]
    pub fn for_predicate(&self, predicate: &str) -> Option<&PropertySpec> {
        self.by_predicate.get(predicate).map(|&idx| &self.properties[idx])
    }
}

/// Schemas by type IRI.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema`, replacing any schema for the same type.
    pub fn register(&mut self, schema: EntitySchema) {
        self.schemas.insert(schema.type_iri.clone(), schema);
    }

    #[must_use]
    pub fn with(mut self, schema: EntitySchema) -> Self {
        self.register(schema);
        self
    }

    #[must_use]
    pub fn get(&self, type_iri: &str) -> Option<&EntitySchema> {
        self.schemas.get(type_iri)
    }

    /// The predicate a slot is stored under: the schema's, or the slot name
    /// itself for generic entities.
    #[must_use]
    pub fn predicate_for<'a>(&'a self, type_iri: &str, slot: &'a str) -> &'a str {
        self.get(type_iri)
            .and_then(|schema| schema.property(slot))
            .map_or(slot, |spec| spec.predicate.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redefining_a_property_replaces_it() {
        let schema = EntitySchema::new("http://ex/T")
            .literal("name", "http://ex/name", LiteralKind::String)
            .literal("name", "http://ex/label", LiteralKind::String);
        assert_eq!(schema.properties().len(), 1);
        assert!(schema.for_predicate("http://ex/name").is_none());
        assert_eq!(schema.for_predicate("http://ex/label").unwrap().name, "name");
    }

    #[test]
    fn predicate_lookup_falls_back_to_slot_name() {
        let registry = SchemaRegistry::new()
            .with(EntitySchema::new("http://ex/T").reference("owner", "http://ex/ownedBy"));
        assert_eq!(registry.predicate_for("http://ex/T", "owner"), "http://ex/ownedBy");
        assert_eq!(registry.predicate_for("http://ex/T", "http://ex/other"), "http://ex/other");
        assert_eq!(registry.predicate_for("http://ex/U", "http://ex/p"), "http://ex/p");
    }
}
