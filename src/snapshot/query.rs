//! Basic graph-pattern queries over a snapshot.
//!
//! A query is a conjunction of triple patterns whose positions are either
//! constants or named variables. Solutions are joined pattern by pattern, each
//! step using the graph's subject/object indexes for bound positions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TemporaResult, ValidationError};
use crate::statement::{Statement, StatementPattern, Term};
use crate::storage::Graph;

/// Variable name to bound term.
pub type Bindings = BTreeMap<String, Term>;

/// One position of a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PatternTerm {
    Var(String),
    Const(Term),
}

impl PatternTerm {
    /// A variable; a leading `?` is stripped.
    #[must_use]
    pub fn var(name: &str) -> Self {
        Self::Var(name.trim_start_matches('?').to_string())
    }

    fn resolve(&self, bindings: &Bindings) -> Option<Term> {
        match self {
            Self::Var(name) => bindings.get(name).cloned(),
            Self::Const(term) => Some(term.clone()),
        }
    }

    fn var_name(&self) -> Option<&str> {
        match self {
            Self::Var(name) => Some(name),
            Self::Const(_) => None,
        }
    }
}

impl From<Term> for PatternTerm {
    fn from(term: Term) -> Self {
        Self::Const(term)
    }
}

impl From<&str> for PatternTerm {
    /// `?name` becomes a variable, anything else an IRI constant.
    fn from(value: &str) -> Self {
        if value.starts_with('?') {
            Self::var(value)
        } else {
            Self::Const(Term::iri(value))
        }
    }
}

impl fmt::Display for PatternTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => write!(f, "?{name}"),
            Self::Const(term) => write!(f, "{term}"),
        }
    }
}

/// A statement with variables allowed in any position.
///
/// # Examples
///
/// ```
/// use tempora::{Term, TriplePattern};
///
/// let p = TriplePattern::new("?building", "http://purl.org/dc/terms/title", Term::literal("Old Hall"));
/// assert_eq!(p.variables(), vec!["building"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl TriplePattern {
    #[must_use]
    pub fn new(subject: impl Into<PatternTerm>, predicate: impl Into<PatternTerm>, object: impl Into<PatternTerm>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Variable names in subject, predicate, object order.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(PatternTerm::var_name)
            .collect()
    }

    /// The store-level pattern for this triple under `bindings`; `None` when a
    /// bound predicate is not an IRI and nothing can match.
    fn bind(&self, bindings: &Bindings) -> Option<StatementPattern> {
        let mut pattern = StatementPattern::any();
        if let Some(subject) = self.subject.resolve(bindings) {
            pattern = pattern.subject(subject);
        }
        if let Some(predicate) = self.predicate.resolve(bindings) {
            pattern = pattern.predicate(predicate.as_iri()?);
        }
        if let Some(object) = self.object.resolve(bindings) {
            pattern = pattern.object(object);
        }
        Some(pattern)
    }

    /// `bindings` extended with the variables this triple binds in `stmt`, or
    /// `None` if a repeated variable disagrees.
    fn extend(&self, bindings: &Bindings, stmt: &Statement) -> Option<Bindings> {
        let mut out = bindings.clone();
        let predicate = Term::iri(stmt.predicate.as_str());
        for (position, value) in [
            (&self.subject, &stmt.subject),
            (&self.predicate, &predicate),
            (&self.object, &stmt.object),
        ] {
            if let PatternTerm::Var(name) = position {
                match out.get(name) {
                    Some(bound) if bound != value => return None,
                    Some(_) => {}
                    None => {
                        out.insert(name.clone(), value.clone());
                    }
                }
            }
        }
        Some(out)
    }

    fn instantiate(&self, bindings: &Bindings) -> Option<Statement> {
        let subject = self.subject.resolve(bindings)?;
        let predicate = self.predicate.resolve(bindings)?;
        let object = self.object.resolve(bindings)?;
        let stmt = Statement::new(subject, predicate.as_iri()?, object);
        stmt.validate().ok().map(|()| stmt)
    }
}

fn check_predicates(patterns: &[TriplePattern]) -> Result<(), ValidationError> {
    for pattern in patterns {
        if let PatternTerm::Const(term) = &pattern.predicate {
            if !term.is_iri() {
                return Err(ValidationError::InvalidQuery {
                    reason: format!("predicate {term} is not an IRI"),
                });
            }
        }
    }
    Ok(())
}

/// Every solution of the conjunction `patterns` over `graph`.
///
/// An empty pattern list has exactly one, empty, solution.
pub(crate) fn solve(graph: &Graph, patterns: &[TriplePattern]) -> TemporaResult<Vec<Bindings>> {
    check_predicates(patterns)?;
    let mut solutions = vec![Bindings::new()];
    for pattern in patterns {
        let mut next = Vec::new();
        for bindings in &solutions {
            let Some(bound) = pattern.bind(bindings) else {
                continue;
            };
            next.extend(graph.matching(&bound).filter_map(|stmt| pattern.extend(bindings, stmt)));
        }
        solutions = next;
        if solutions.is_empty() {
            break;
        }
    }
    Ok(solutions)
}

/// Instantiates `template` once per solution of `patterns`.
///
/// Instantiations that do not form a valid statement (a literal subject, a
/// non-IRI predicate) are skipped.
pub(crate) fn construct(graph: &Graph, template: &[TriplePattern], patterns: &[TriplePattern]) -> TemporaResult<Graph> {
    check_predicates(template)?;
    let bound: BTreeSet<&str> = patterns.iter().flat_map(TriplePattern::variables).collect();
    for triple in template {
        if let Some(unbound) = triple.variables().into_iter().find(|v| !bound.contains(v)) {
            return Err(ValidationError::InvalidQuery {
                reason: format!("template variable ?{unbound} is not bound by the pattern"),
            }
            .into());
        }
    }

    let mut out = Graph::new();
    for solution in solve(graph, patterns)? {
        for triple in template {
            if let Some(stmt) = triple.instantiate(&solution) {
                out.insert(stmt);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEAR: &str = "http://ex/near";
    const NAME: &str = "http://ex/name";

    fn graph() -> Graph {
        [
            Statement::new("http://ex/a", NEAR, Term::iri("http://ex/b")),
            Statement::new("http://ex/b", NEAR, Term::iri("http://ex/c")),
            Statement::new("http://ex/c", NEAR, Term::iri("http://ex/c")),
            Statement::new("http://ex/b", NAME, Term::literal("Bee")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn joins_on_shared_variables() {
        let solutions = solve(
            &graph(),
            &[
                TriplePattern::new("?x", NEAR, "?y"),
                TriplePattern::new("?y", NAME, "?name"),
            ],
        )
        .unwrap();
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0]["x"], Term::iri("http://ex/a"));
        assert_eq!(solutions[0]["name"], Term::literal("Bee"));
    }

    #[test]
    fn repeated_variable_must_agree() {
        let solutions = solve(&graph(), &[TriplePattern::new("?x", NEAR, "?x")]).unwrap();
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0]["x"], Term::iri("http://ex/c"));
    }

    #[test]
    fn variable_predicates_bind_iris() {
        let solutions = solve(&graph(), &[TriplePattern::new("http://ex/b", "?p", "?o")]).unwrap();
        let predicates: BTreeSet<_> = solutions.iter().map(|s| s["p"].clone()).collect();
        assert_eq!(predicates, BTreeSet::from([Term::iri(NEAR), Term::iri(NAME)]));
    }

    #[test]
    fn empty_query_has_one_solution() {
        assert_eq!(solve(&graph(), &[]).unwrap(), vec![Bindings::new()]);
    }

    #[test]
    fn construct_rejects_unbound_template_variables() {
        let err = construct(
            &graph(),
            &[TriplePattern::new("?x", NEAR, "?z")],
            &[TriplePattern::new("?x", NEAR, "?y")],
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn construct_builds_new_statements() {
        let inverse = construct(
            &graph(),
            &[TriplePattern::new("?y", "http://ex/nearOf", "?x")],
            &[TriplePattern::new("?x", NEAR, "?y")],
        )
        .unwrap();
        assert_eq!(inverse.len(), 3);
        assert!(inverse.contains(&Statement::new("http://ex/b", "http://ex/nearOf", Term::iri("http://ex/a"))));
    }

    #[test]
    fn literal_predicate_is_rejected() {
        let err = solve(&graph(), &[TriplePattern::new("?x", Term::literal("p"), "?y")]).unwrap_err();
        assert!(err.is_validation());
    }
}
