//! Resource filters (checked before construction) and entity filters
//! (checked after).

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use regex::Regex;

use crate::error::ValidationError;
use crate::pool::entity::Entity;
use crate::statement::{Statement, Term};

static REGEX_CACHE: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();
const REGEX_CACHE_MAX: usize = 256;

fn cached_regex(pattern: &str) -> Result<Regex, ValidationError> {
    let cache = REGEX_CACHE.get_or_init(|| RwLock::new(HashMap::new()));

    if let Some(re) = cache.read().unwrap_or_else(PoisonError::into_inner).get(pattern) {
        return Ok(re.clone());
    }

    let compiled = Regex::new(pattern).map_err(|e| ValidationError::InvalidPattern {
        reason: format!("invalid regex '{pattern}': {e}"),
    })?;

    let mut guard = cache.write().unwrap_or_else(PoisonError::into_inner);
    if guard.len() >= REGEX_CACHE_MAX {
        guard.clear();
    }
    guard.insert(pattern.to_string(), compiled.clone());
    Ok(compiled)
}

type ResourcePredicate = dyn Fn(&str, &[&Statement]) -> bool + Send + Sync;
type EntityPredicate = dyn Fn(&Entity) -> bool + Send + Sync;

/// A test over a resource's raw statements, applied before its entity is
/// built. A resource must pass every registered filter to be admitted.
#[derive(Clone)]
pub enum ResourceFilter {
    HasProperty { predicate: String },
    PropertyEquals { predicate: String, value: Term },
    /// Some object of `predicate` (literal lexical form or resource key)
    /// matches `pattern`.
    PropertyMatches { predicate: String, pattern: Regex },
    /// Called with the resource key and its statements.
    Custom(Arc<ResourcePredicate>),
}

impl ResourceFilter {
    #[must_use]
    pub fn has_property(predicate: impl Into<String>) -> Self {
        Self::HasProperty {
            predicate: predicate.into(),
        }
    }

    #[must_use]
    pub fn property_equals(predicate: impl Into<String>, value: Term) -> Self {
        Self::PropertyEquals {
            predicate: predicate.into(),
            value,
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidPattern` if `pattern` is not a valid regex.
    pub fn property_matches(predicate: impl Into<String>, pattern: &str) -> Result<Self, ValidationError> {
        Ok(Self::PropertyMatches {
            predicate: predicate.into(),
            pattern: cached_regex(pattern)?,
        })
    }

    pub fn custom(f: impl Fn(&str, &[&Statement]) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    #[must_use]
    pub fn accepts(&self, resource: &str, statements: &[&Statement]) -> bool {
        match self {
            Self::HasProperty { predicate } => statements.iter().any(|s| s.predicate == *predicate),
            Self::PropertyEquals { predicate, value } => statements
                .iter()
                .any(|s| s.predicate == *predicate && s.object == *value),
            Self::PropertyMatches { predicate, pattern } => statements
                .iter()
                .filter(|s| s.predicate == *predicate)
                .any(|s| match &s.object {
                    Term::Literal(literal) => pattern.is_match(&literal.lexical),
                    other => other.resource_key().is_some_and(|key| pattern.is_match(&key)),
                }),
            Self::Custom(f) => f(resource, statements),
        }
    }
}

impl fmt::Debug for ResourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HasProperty { predicate } => f.debug_struct("HasProperty").field("predicate", predicate).finish(),
            Self::PropertyEquals { predicate, value } => f
                .debug_struct("PropertyEquals")
                .field("predicate", predicate)
                .field("value", value)
                .finish(),
            Self::PropertyMatches { predicate, pattern } => f
                .debug_struct("PropertyMatches")
                .field("predicate", predicate)
                .field("pattern", &pattern.as_str())
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A test over a constructed entity, optionally scoped to one type.
#[derive(Clone)]
pub struct EntityFilter {
    applies_to: Option<String>,
    predicate: Arc<EntityPredicate>,
}

impl EntityFilter {
    /// A filter applied to every entity.
    pub fn new(f: impl Fn(&Entity) -> bool + Send + Sync + 'static) -> Self {
        Self {
            applies_to: None,
            predicate: Arc::new(f),
        }
    }

    /// A filter applied only to entities of `type_iri`.
    pub fn for_type(type_iri: impl Into<String>, f: impl Fn(&Entity) -> bool + Send + Sync + 'static) -> Self {
        Self {
            applies_to: Some(type_iri.into()),
            predicate: Arc::new(f),
        }
    }

    #[must_use]
    pub fn applies_to(&self) -> Option<&str> {
        self.applies_to.as_deref()
    }

    /// True if the entity is kept; entities outside the filter's type scope
    /// are always kept.
    #[must_use]
    pub fn accepts(&self, entity: &Entity) -> bool {
        match &self.applies_to {
            Some(type_iri) if type_iri != entity.type_iri() => true,
            _ => (self.predicate)(entity),
        }
    }
}

impl fmt::Debug for EntityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFilter")
            .field("applies_to", &self.applies_to)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "http://ex/name";

    fn statements() -> Vec<Statement> {
        vec![
            Statement::type_assertion("http://ex/a", "http://ex/T"),
            Statement::new("http://ex/a", NAME, Term::literal("Harbour Street")),
            Statement::new("http://ex/a", "http://ex/next", Term::iri("http://ex/b")),
        ]
    }

    #[test]
    fn property_filters() {
        let owned = statements();
        let stmts: Vec<&Statement> = owned.iter().collect();
        assert!(ResourceFilter::has_property(NAME).accepts("http://ex/a", &stmts));
        assert!(!ResourceFilter::has_property("http://ex/none").accepts("http://ex/a", &stmts));
        assert!(ResourceFilter::property_equals(NAME, Term::literal("Harbour Street")).accepts("http://ex/a", &stmts));
        assert!(!ResourceFilter::property_equals(NAME, Term::literal("harbour street")).accepts("http://ex/a", &stmts));
        assert!(ResourceFilter::property_matches(NAME, "(?i)^harbour")
            .unwrap()
            .accepts("http://ex/a", &stmts));
        assert!(ResourceFilter::property_matches("http://ex/next", "/b$")
            .unwrap()
            .accepts("http://ex/a", &stmts));
        assert!(ResourceFilter::custom(|uri, s| uri.ends_with('a') && s.len() == 3).accepts("http://ex/a", &stmts));
    }

    #[test]
    fn invalid_regex_is_a_validation_error() {
        let err = ResourceFilter::property_matches(NAME, "(unclosed").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPattern { .. }));
    }

    #[test]
    fn scoped_entity_filter_ignores_other_types() {
        let filter = EntityFilter::for_type("http://ex/T", |_| false);
        assert!(!filter.accepts(&Entity::new("http://ex/a", "http://ex/T")));
        assert!(filter.accepts(&Entity::new("http://ex/b", "http://ex/U")));
        assert!(!EntityFilter::new(|e| e.uri().ends_with('z')).accepts(&Entity::new("http://ex/b", "http://ex/U")));
    }
}
