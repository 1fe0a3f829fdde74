//! Indexed fact storage
//!
//! Facts are kept in insertion order, with two secondary indexes:
//! - by predicate
//! - by (predicate, position, constant) for goals that carry constants
//!
//! Both indexes hold `Arc`s into the same facts, so a fact is stored once.

use super::types::{Literal, Term};
use ahash::{AHashMap, AHashSet};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

type ConstantKey = (Arc<str>, usize, Arc<str>);

/// A set of ground literals with lookup indexes
#[derive(Clone)]
pub struct FactSet {
    facts: Vec<Arc<Literal>>,
    members: AHashSet<Arc<Literal>>,
    by_predicate: AHashMap<Arc<str>, Vec<Arc<Literal>>>,
    by_constant: AHashMap<ConstantKey, Vec<Arc<Literal>>>,
    constant_index: bool,
}

impl Default for FactSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FactSet {
    /// Create an empty set with both indexes enabled
    pub fn new() -> Self {
        Self::with_constant_index(true)
    }

    /// Create an empty set, optionally without the constant index
    pub fn with_constant_index(enabled: bool) -> Self {
        FactSet {
            facts: Vec::new(),
            members: AHashSet::new(),
            by_predicate: AHashMap::new(),
            by_constant: AHashMap::new(),
            constant_index: enabled,
        }
    }

    /// An empty set with the same index settings
    pub fn empty_like(&self) -> Self {
        Self::with_constant_index(self.constant_index)
    }

    /// Insert a fact. Returns `true` if it was not already present.
    pub fn add(&mut self, fact: impl Into<Arc<Literal>>) -> bool {
        let fact = fact.into();
        if self.members.contains(&fact) {
            return false;
        }
        self.index(&fact);
        self.members.insert(fact.clone());
        self.facts.push(fact);
        true
    }

    /// Insert many facts, returning how many were new
    pub fn extend<I>(&mut self, facts: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<Arc<Literal>>,
    {
        let mut added = 0;
        for fact in facts {
            if self.add(fact) {
                added += 1;
            }
        }
        added
    }

    fn index(&mut self, fact: &Arc<Literal>) {
        let predicate = fact.predicate_arc();
        self.by_predicate
            .entry(predicate.clone())
            .or_default()
            .push(fact.clone());

        if self.constant_index {
            for (position, term) in fact.terms().iter().enumerate() {
                if let Term::Constant(value) = term {
                    self.by_constant
                        .entry((predicate.clone(), position, value.clone()))
                        .or_default()
                        .push(fact.clone());
                }
            }
        }
    }

    /// Remove every fact in `facts`. Returns `true` if anything was removed.
    pub fn remove_all<'a, I>(&mut self, facts: I) -> bool
    where
        I: IntoIterator<Item = &'a Literal>,
    {
        let doomed: AHashSet<&Literal> = facts.into_iter().collect();
        let before = self.facts.len();
        self.facts.retain(|f| !doomed.contains(f.as_ref()));
        if self.facts.len() == before {
            return false;
        }

        self.members.clear();
        self.by_predicate.clear();
        self.by_constant.clear();
        for fact in std::mem::take(&mut self.facts) {
            self.index(&fact);
            self.members.insert(fact.clone());
            self.facts.push(fact);
        }
        true
    }

    /// Membership test
    pub fn contains(&self, fact: &Literal) -> bool {
        self.members.contains(fact)
    }

    /// Number of facts
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// True when the set holds no facts
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Facts in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Literal>> {
        self.facts.iter()
    }

    /// Predicates that have at least one fact
    pub fn predicates(&self) -> impl Iterator<Item = &Arc<str>> {
        self.by_predicate.keys()
    }

    /// Whether any fact has this predicate
    pub fn has_predicate(&self, predicate: &str) -> bool {
        self.by_predicate.contains_key(predicate)
    }

    /// All facts with the given predicate
    pub fn by_predicate(&self, predicate: &str) -> &[Arc<Literal>] {
        self.by_predicate.get(predicate).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Facts with the given predicate holding `value` at `position`
    ///
    /// Borrowed from the constant index when it is enabled, otherwise collected
    /// by scanning the predicate's facts.
    pub fn by_predicate_and_constant(&self, predicate: &str, position: usize, value: &str) -> Cow<'_, [Arc<Literal>]> {
        if !self.constant_index {
            return Cow::Owned(
                self.by_predicate(predicate)
                    .iter()
                    .filter(|fact| {
                        fact.terms()
                            .get(position)
                            .is_some_and(|term| term.is_constant() && term.text() == value)
                    })
                    .cloned()
                    .collect(),
            );
        }
        let key = (Arc::from(predicate), position, Arc::from(value));
        Cow::Borrowed(self.by_constant.get(&key).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Facts that might unify with `goal`: the smallest bucket over the goal's
    /// constant positions, or every fact of its predicate
    pub fn candidates(&self, goal: &Literal) -> &[Arc<Literal>] {
        let all = self.by_predicate(goal.predicate());
        if !self.constant_index || all.is_empty() {
            return all;
        }

        let mut best = all;
        for (position, term) in goal.terms().iter().enumerate() {
            if let Term::Constant(value) = term {
                let key = (goal.predicate_arc().clone(), position, value.clone());
                match self.by_constant.get(&key) {
                    Some(bucket) if bucket.len() < best.len() => best = bucket.as_slice(),
                    Some(_) => {}
                    // No fact has this constant here, so nothing can match
                    None => return &[],
                }
            }
        }
        best
    }
}

impl<L: Into<Arc<Literal>>> FromIterator<L> for FactSet {
    fn from_iter<I: IntoIterator<Item = L>>(iter: I) -> Self {
        let mut set = FactSet::new();
        set.extend(iter);
        set
    }
}

impl PartialEq for FactSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.facts.iter().all(|f| other.contains(f))
    }
}

impl Eq for FactSet {}

impl fmt::Debug for FactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.facts.iter().map(|l| l.to_string())).finish()
    }
}
