//! Set-semantics statement graph with subject and object indexes.

use std::collections::{HashMap, HashSet};

use crate::statement::{Statement, StatementPattern, Term};

/// An in-memory set of statements.
///
/// Used as the body of a container and as the flat target of a snapshot.
/// Inserting a statement twice is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    statements: HashSet<Statement>,
    by_subject: HashMap<Term, HashSet<Statement>>,
    by_object: HashMap<Term, HashSet<Statement>>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Returns false if the statement was already present.
    pub fn insert(&mut self, stmt: Statement) -> bool {
        if self.statements.contains(&stmt) {
            return false;
        }
        self.by_subject
            .entry(stmt.subject.clone())
            .or_default()
            .insert(stmt.clone());
        self.by_object
            .entry(stmt.object.clone())
            .or_default()
            .insert(stmt.clone());
        self.statements.insert(stmt)
    }

    /// Returns false if the statement was absent.
    pub fn remove(&mut self, stmt: &Statement) -> bool {
        if !self.statements.remove(stmt) {
            return false;
        }
        unindex(&mut self.by_subject, &stmt.subject, stmt);
        unindex(&mut self.by_object, &stmt.object, stmt);
        true
    }

    #[must_use]
    pub fn contains(&self, stmt: &Statement) -> bool {
        self.statements.contains(stmt)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter()
    }

    /// All statements matching the pattern, using an index when the subject
    /// or object is bound.
    pub fn matching<'a>(&'a self, pattern: &'a StatementPattern) -> Box<dyn Iterator<Item = &'a Statement> + 'a> {
        let candidates: Box<dyn Iterator<Item = &'a Statement> + 'a> = match (&pattern.subject, &pattern.object) {
            (Some(subject), _) => match self.by_subject.get(subject) {
                Some(set) => Box::new(set.iter()),
                None => Box::new(std::iter::empty()),
            },
            (None, Some(object)) => match self.by_object.get(object) {
                Some(set) => Box::new(set.iter()),
                None => Box::new(std::iter::empty()),
            },
            (None, None) => Box::new(self.statements.iter()),
        };
        Box::new(candidates.filter(move |stmt| pattern.matches(stmt)))
    }

    #[must_use]
    pub fn contains_match(&self, pattern: &StatementPattern) -> bool {
        self.matching(pattern).next().is_some()
    }

    /// Statements whose subject is `subject`, from the subject index.
    pub fn about<'a>(&'a self, subject: &Term) -> impl Iterator<Item = &'a Statement> + 'a {
        self.by_subject.get(subject).into_iter().flatten()
    }

    /// True if `subject` appears as the subject of any statement.
    #[must_use]
    pub fn has_subject(&self, subject: &Term) -> bool {
        self.by_subject.get(subject).is_some_and(|s| !s.is_empty())
    }
}

impl FromIterator<Statement> for Graph {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        let mut graph = Self::new();
        for stmt in iter {
            graph.insert(stmt);
        }
        graph
    }
}

fn unindex(index: &mut HashMap<Term, HashSet<Statement>>, key: &Term, stmt: &Statement) {
    if let Some(set) = index.get_mut(key) {
        set.remove(stmt);
        if set.is_empty() {
            index.remove(key);
        }
    }
}
