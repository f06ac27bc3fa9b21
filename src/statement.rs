//! Subject/predicate/object statements and wildcard patterns over them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::vocab::xsd;

/// A literal value with optional datatype or language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// A node in a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    #[must_use]
    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri(value.into())
    }

    #[must_use]
    pub fn blank(label: impl Into<String>) -> Self {
        Self::Blank(label.into())
    }

    /// A plain string literal.
    #[must_use]
    pub fn literal(lexical: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        })
    }

    #[must_use]
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        })
    }

    #[must_use]
    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        })
    }

    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), xsd::INTEGER)
    }

    #[must_use]
    pub fn double(value: f64) -> Self {
        Self::typed(value.to_string(), xsd::DOUBLE)
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::typed(value.to_string(), xsd::BOOLEAN)
    }

    pub const fn is_iri(&self) -> bool {
        matches!(self, Self::Iri(_))
    }

    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Resources are IRIs and blank nodes: anything that can be a subject.
    pub const fn is_resource(&self) -> bool {
        matches!(self, Self::Iri(_) | Self::Blank(_))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(l) => Some(l),
            _ => None,
        }
    }
}

impl Term {
    /// The string identifying a resource: the IRI, or `_:label` for a blank
    /// node. `None` for literals.
    #[must_use]
    pub fn resource_key(&self) -> Option<String> {
        match self {
            Self::Iri(v) => Some(v.clone()),
            Self::Blank(v) => Some(format!("_:{v}")),
            Self::Literal(_) => None,
        }
    }
}

/// Inverse of [`Term::resource_key`].
#[must_use]
pub fn resource_term(key: &str) -> Term {
    match key.strip_prefix("_:") {
        Some(label) => Term::blank(label),
        None => Term::iri(key),
    }
}

impl From<&str> for Term {
    /// Strings convert to IRIs; use [`Term::literal`] for literals.
    fn from(value: &str) -> Self {
        Self::iri(value)
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Self::Iri(value)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(v) => write!(f, "<{v}>"),
            Self::Blank(v) => write!(f, "_:{v}"),
            Self::Literal(l) => {
                write!(f, "{:?}", l.lexical)?;
                if let Some(lang) = &l.language {
                    write!(f, "@{lang}")?;
                } else if let Some(dt) = &l.datatype {
                    write!(f, "^^<{dt}>")?;
                }
                Ok(())
            }
        }
    }
}

/// A (subject, predicate, object) fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Statement {
    #[must_use]
    pub fn new(subject: impl Into<Term>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }

    /// `subject rdf:type type_iri`.
    #[must_use]
    pub fn type_assertion(subject: impl Into<String>, type_iri: impl Into<String>) -> Self {
        Self::new(
            Term::Iri(subject.into()),
            crate::vocab::rdf::TYPE,
            Term::Iri(type_iri.into()),
        )
    }

    #[must_use]
    pub fn is_type_assertion(&self) -> bool {
        self.predicate == crate::vocab::rdf::TYPE
    }

    /// The subject's IRI, if it has one.
    #[must_use]
    pub fn subject_iri(&self) -> Option<&str> {
        self.subject.as_iri()
    }

    /// Checks the statement is well-formed enough to be stored.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyUri` for an empty subject or predicate
    /// IRI, and `MissingField` when the subject is a literal.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.predicate.trim().is_empty() {
            return Err(ValidationError::EmptyUri);
        }
        match &self.subject {
            Term::Iri(v) if v.trim().is_empty() => Err(ValidationError::EmptyUri),
            Term::Literal(_) => Err(ValidationError::MissingField {
                field: "subject resource".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}

/// A statement pattern; `None` positions match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementPattern {
    pub subject: Option<Term>,
    pub predicate: Option<String>,
    pub object: Option<Term>,
}

impl StatementPattern {
    /// The all-wildcard pattern.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<Term>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    #[must_use]
    pub fn object(mut self, object: Term) -> Self {
        self.object = Some(object);
        self
    }

    #[must_use]
    pub fn matches(&self, stmt: &Statement) -> bool {
        self.subject.as_ref().map_or(true, |s| *s == stmt.subject)
            && self.predicate.as_ref().map_or(true, |p| *p == stmt.predicate)
            && self.object.as_ref().map_or(true, |o| *o == stmt.object)
    }
}
