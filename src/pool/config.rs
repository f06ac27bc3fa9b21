//! Pool build configuration.

use std::sync::Arc;

use crate::pool::filter::{EntityFilter, ResourceFilter};
use crate::pool::schema::SchemaRegistry;

/// What a pool build starts from and what it admits.
///
/// # Examples
///
/// ```
/// use tempora::{PoolConfig, ResourceFilter};
///
/// let config = PoolConfig::new()
///     .seed("http://ex/hall")
///     .accept_type("http://ex/Building")
///     .resource_filter(ResourceFilter::has_property("http://purl.org/dc/terms/title"))
///     .follow_references(false);
///
/// assert_eq!(config.seed_uris().map(<[String]>::len), Some(1));
/// assert!(!config.follows_references());
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    seeds: Option<Vec<String>>,
    accepted_types: Vec<String>,
    unaccepted_types: Vec<String>,
    entity_filters: Vec<EntityFilter>,
    resource_filters: Vec<ResourceFilter>,
    follow_references: bool,
    schema: Arc<SchemaRegistry>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            seeds: None,
            accepted_types: Vec::new(),
            unaccepted_types: Vec::new(),
            entity_filters: Vec::new(),
            resource_filters: Vec::new(),
            follow_references: true,
            schema: Arc::new(SchemaRegistry::new()),
        }
    }
}

impl PoolConfig {
    /// No explicit seeds (every typed resource), references followed, no
    /// schemas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one seed resource. Any call to `seed` or `seeds` makes the seed set
    /// explicit.
    #[must_use]
    pub fn seed(mut self, uri: impl Into<String>) -> Self {
        self.seeds.get_or_insert_with(Vec::new).push(uri.into());
        self
    }

    #[must_use]
    pub fn seeds<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seeds
            .get_or_insert_with(Vec::new)
            .extend(uris.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn accept_type(mut self, type_iri: impl Into<String>) -> Self {
        self.accepted_types.push(type_iri.into());
        self
    }

    #[must_use]
    pub fn reject_type(mut self, type_iri: impl Into<String>) -> Self {
        self.unaccepted_types.push(type_iri.into());
        self
    }

    #[must_use]
    pub fn resource_filter(mut self, filter: ResourceFilter) -> Self {
        self.resource_filters.push(filter);
        self
    }

    /// Entity filters run in the order they are added.
    #[must_use]
    pub fn entity_filter(mut self, filter: EntityFilter) -> Self {
        self.entity_filters.push(filter);
        self
    }

    #[must_use]
    pub const fn follow_references(mut self, follow: bool) -> Self {
        self.follow_references = follow;
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: Arc<SchemaRegistry>) -> Self {
        self.schema = schema;
        self
    }

    /// `None` when seeding from every typed resource.
    #[must_use]
    pub fn seed_uris(&self) -> Option<&[String]> {
        self.seeds.as_deref()
    }

    #[must_use]
    pub fn accepted_types(&self) -> &[String] {
        &self.accepted_types
    }

    #[must_use]
    pub fn unaccepted_types(&self) -> &[String] {
        &self.unaccepted_types
    }

    #[must_use]
    pub fn entity_filters(&self) -> &[EntityFilter] {
        &self.entity_filters
    }

    #[must_use]
    pub fn resource_filters(&self) -> &[ResourceFilter] {
        &self.resource_filters
    }

    #[must_use]
    pub const fn follows_references(&self) -> bool {
        self.follow_references
    }

    #[must_use]
    pub fn schema_registry(&self) -> &Arc<SchemaRegistry> {
        &self.schema
    }

    /// True unless `type_iri` is rejected or missing from a non-empty accept
    /// list.
    #[must_use]
    pub fn accepts_type(&self, type_iri: &str) -> bool {
        if self.unaccepted_types.iter().any(|t| t == type_iri) {
            return false;
        }
        self.accepted_types.is_empty() || self.accepted_types.iter().any(|t| t == type_iri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_lists() {
        let open = PoolConfig::new();
        assert!(open.accepts_type("http://ex/Any"));

        let config = PoolConfig::new()
            .accept_type("http://ex/A")
            .accept_type("http://ex/B")
            .reject_type("http://ex/B");
        assert!(config.accepts_type("http://ex/A"));
        assert!(!config.accepts_type("http://ex/B"));
        assert!(!config.accepts_type("http://ex/C"));
    }

    #[test]
    fn empty_seed_list_is_explicit() {
        let config = PoolConfig::new().seeds(Vec::<String>::new());
        assert_eq!(config.seed_uris().map(<[String]>::len), Some(0));
        assert!(PoolConfig::new().seed_uris().is_none());
        assert!(PoolConfig::new().follows_references());
    }
}
