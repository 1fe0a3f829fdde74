//! Storage for extensional facts
//!
//! The engine reads and writes its EDB through [`FactProvider`], so callers can
//! substitute their own store. [`MemoryProvider`] keeps everything in a
//! [`FactSet`].

use super::fact_set::FactSet;
use super::types::Literal;
use std::sync::Arc;

/// Source of the facts an engine reasons over
pub trait FactProvider: Send + Sync {
    /// Every stored fact
    fn all_facts(&self) -> &FactSet;

    /// Store a fact. Returns `true` if it was new.
    fn add(&mut self, fact: Literal) -> bool;

    /// Remove the given facts. Returns `true` if any were present.
    fn remove_all(&mut self, facts: &[Literal]) -> bool;

    /// Stored facts with the given predicate
    fn facts_for(&self, predicate: &str) -> &[Arc<Literal>] {
        self.all_facts().by_predicate(predicate)
    }

    /// Number of stored facts
    fn len(&self) -> usize {
        self.all_facts().len()
    }

    /// True when nothing is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory fact provider
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    facts: FactSet,
}

impl MemoryProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty provider, optionally without the constant index
    pub fn with_constant_index(enabled: bool) -> Self {
        MemoryProvider {
            facts: FactSet::with_constant_index(enabled),
        }
    }
}

impl FactProvider for MemoryProvider {
    fn all_facts(&self) -> &FactSet {
        &self.facts
    }

    fn add(&mut self, fact: Literal) -> bool {
        self.facts.add(fact)
    }

    fn remove_all(&mut self, facts: &[Literal]) -> bool {
        self.facts.remove_all(facts)
    }
}
