//! The Strata engine: fact and rule storage plus query answering

use crate::config::EngineConfig;
use crate::datalog::{
    reorder_goals, stratify, validate_fact, validate_rule, Bindings, EvaluationStats, FactProvider,
    FactSet, GoalMatcher, Literal, MemoryProvider, Rule, SemiNaiveEvaluator, Term,
};
use crate::error::{Result, StrataError};
use crate::monitoring;
use crate::parser::parse_program;
use parking_lot::RwLock;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Answers to a query together with the evaluation statistics
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    /// One entry per solution; empty means "No."
    pub answers: Vec<Bindings>,
    /// Work done deriving facts for this query
    pub stats: EvaluationStats,
}

/// Main Strata engine
///
/// Holds the extensional facts (through a [`FactProvider`]) and the rules.
/// Derived facts are never stored: every query derives what it needs into a
/// working set that is dropped when the query returns.
pub struct Engine {
    /// Extensional facts
    edb: Box<dyn FactProvider>,
    /// Rules, in insertion order
    idb: Vec<Arc<Rule>>,
    /// Engine configuration
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create a new engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new engine with specified configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            edb: Box::new(MemoryProvider::with_constant_index(config.constant_index)),
            idb: Vec::new(),
            config,
        }
    }

    /// Replace the fact store. Facts already added to the old store are dropped.
    pub fn with_provider(mut self, provider: impl FactProvider + 'static) -> Self {
        self.edb = Box::new(provider);
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Extensional facts
    pub fn facts(&self) -> &FactSet {
        self.edb.all_facts()
    }

    /// Rules, in insertion order
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.idb
    }

    /// Add the fact `predicate(terms...)`
    pub fn add_fact(&mut self, predicate: impl AsRef<str>, terms: Vec<Term>) -> Result<()> {
        self.fact(Literal::new(predicate, terms))
    }

    /// Add a fact. It must be ground, positive and not a built-in.
    pub fn fact(&mut self, fact: Literal) -> Result<()> {
        validate_fact(&fact)?;
        if !self.edb.add(fact) {
            debug!("Ignoring duplicate fact");
        }
        Ok(())
    }

    /// Add the rule `head :- body`
    pub fn add_rule(&mut self, head: Literal, body: Vec<Literal>) -> Result<()> {
        self.rule(Rule::new(head, body))
    }

    /// Add a rule after checking its safety and that the rule set stays stratifiable
    pub fn rule(&mut self, rule: Rule) -> Result<()> {
        validate_rule(&rule)?;
        if self.idb.iter().any(|existing| **existing == rule) {
            debug!(%rule, "Ignoring duplicate rule");
            return Ok(());
        }

        self.idb.push(Arc::new(rule));
        if let Err(e) = stratify(&self.idb) {
            self.idb.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Check every rule, the stratification of the rule set and every fact
    pub fn validate(&self) -> Result<()> {
        for rule in &self.idb {
            validate_rule(rule)?;
        }
        stratify(&self.idb)?;
        for fact in self.edb.all_facts().iter() {
            validate_fact(fact)?;
        }
        Ok(())
    }

    /// Answer a query
    ///
    /// Returns one [`Bindings`] per solution. No solutions means the goals do
    /// not hold; a single empty binding means a query without variables holds.
    pub fn query(&self, goals: &[Literal], bindings: Option<&Bindings>) -> Result<Vec<Bindings>> {
        self.query_with_stats(goals, bindings).map(|outcome| outcome.answers)
    }

    /// Answer a query and report the evaluation work it took
    #[instrument(skip(self, goals, bindings), fields(goals = goals.len()))]
    pub fn query_with_stats(&self, goals: &[Literal], bindings: Option<&Bindings>) -> Result<QueryOutcome> {
        let start = Instant::now();
        let result = self.evaluate(goals, bindings);

        monitoring::record_query(start.elapsed(), result.is_ok());
        match &result {
            Ok(outcome) => {
                monitoring::record_derived(outcome.stats.facts_derived);
                debug!(
                    answers = outcome.answers.len(),
                    derived = outcome.stats.facts_derived,
                    "Query answered"
                );
            }
            Err(e) => {
                monitoring::record_fault(e.kind());
                warn!(error = %e, "Query failed");
            }
        }
        result
    }

    fn evaluate(&self, goals: &[Literal], bindings: Option<&Bindings>) -> Result<QueryOutcome> {
        if goals.is_empty() {
            return Ok(QueryOutcome::default());
        }
        let goals = reorder_goals(goals.to_vec());

        let (mut facts, rules) = if self.config.relevance_filtering {
            let relevant = self.relevant_predicates(&goals);
            let rules: Vec<Arc<Rule>> = self
                .idb
                .iter()
                .filter(|rule| relevant.contains(rule.head().predicate()))
                .cloned()
                .collect();

            let mut facts = self.edb.all_facts().empty_like();
            for predicate in &relevant {
                facts.extend(self.edb.facts_for(predicate).iter().cloned());
            }
            (facts, rules)
        } else {
            (self.edb.all_facts().clone(), self.idb.clone())
        };

        let stats = SemiNaiveEvaluator::new(self.config.comparison_mode).expand(&mut facts, &rules)?;
        let answers = GoalMatcher::new(&facts, self.config.comparison_mode).solve(&goals, bindings)?;
        Ok(QueryOutcome { answers, stats })
    }

    /// Predicates the goals can depend on, following rule bodies transitively
    fn relevant_predicates<'a>(&'a self, goals: &'a [Literal]) -> HashSet<&'a str> {
        let mut relevant = HashSet::new();
        let mut pending: VecDeque<&Literal> = goals.iter().collect();

        while let Some(goal) = pending.pop_front() {
            if !relevant.insert(goal.predicate()) {
                continue;
            }
            for rule in self.idb.iter().filter(|r| r.head().predicate() == goal.predicate()) {
                pending.extend(rule.body().iter());
            }
        }
        relevant
    }

    /// Remove the facts matching `goals`
    ///
    /// The goals are answered as a query; each answer is substituted back into
    /// the goals and the resulting stored facts are removed. Derived facts are
    /// never stored, so only extensional facts can be deleted. Returns whether
    /// anything was removed.
    #[instrument(skip(self, goals, bindings), fields(goals = goals.len()))]
    pub fn delete(&mut self, goals: &[Literal], bindings: Option<&Bindings>) -> Result<bool> {
        let answers = self.query(goals, bindings)?;
        let doomed: Vec<Literal> = answers
            .iter()
            .flat_map(|answer| goals.iter().map(move |goal| goal.substitute(answer)))
            .filter(|fact| !fact.is_negated() && !fact.is_builtin() && fact.is_ground())
            .collect();

        let removed = self.edb.remove_all(&doomed);
        debug!(candidates = doomed.len(), removed, "Delete finished");
        Ok(removed)
    }

    /// Execute a program, returning the answers of its last query
    ///
    /// Failures are reported with the line of the statement that caused them.
    pub fn execute(&mut self, source: &str) -> Result<Option<Vec<Bindings>>> {
        self.execute_with(source, None)
    }

    /// Execute a program with bindings applied to every statement
    pub fn execute_with(&mut self, source: &str, bindings: Option<&Bindings>) -> Result<Option<Vec<Bindings>>> {
        let mut last = None;
        for parsed in parse_program(source)? {
            let answers = parsed
                .statement
                .execute(self, bindings)
                .map_err(|e| StrataError::Statement {
                    line: parsed.line,
                    source: Box::new(e),
                })?;
            if answers.is_some() {
                last = answers;
            }
        }
        Ok(last)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "% Facts:")?;
        for fact in self.edb.all_facts().iter() {
            writeln!(f, "{}.", fact)?;
        }
        writeln!(f, "% Rules:")?;
        for rule in &self.idb {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("facts", &self.edb.len())
            .field("rules", &self.idb.len())
            .field("config", &self.config)
            .finish()
    }
}

/// An [`Engine`] shared between threads
///
/// Queries take a read lock and can run concurrently; insertions and
/// deletions take the write lock.
#[derive(Clone, Default)]
pub struct SharedEngine {
    inner: Arc<RwLock<Engine>>,
}

impl SharedEngine {
    /// Wrap an engine
    pub fn new(engine: Engine) -> Self {
        SharedEngine {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Answer a query under a read lock
    pub fn query(&self, goals: &[Literal], bindings: Option<&Bindings>) -> Result<Vec<Bindings>> {
        self.inner.read().query(goals, bindings)
    }

    /// Add a fact under the write lock
    pub fn fact(&self, fact: Literal) -> Result<()> {
        self.inner.write().fact(fact)
    }

    /// Add a rule under the write lock
    pub fn rule(&self, rule: Rule) -> Result<()> {
        self.inner.write().rule(rule)
    }

    /// Delete matching facts under the write lock
    pub fn delete(&self, goals: &[Literal], bindings: Option<&Bindings>) -> Result<bool> {
        self.inner.write().delete(goals, bindings)
    }

    /// Execute a program under the write lock
    pub fn execute(&self, source: &str) -> Result<Option<Vec<Bindings>>> {
        self.inner.write().execute(source)
    }

    /// Run `f` with shared access to the engine
    pub fn read<R>(&self, f: impl FnOnce(&Engine) -> R) -> R {
        f(&self.inner.read())
    }
}

impl From<Engine> for SharedEngine {
    fn from(engine: Engine) -> Self {
        SharedEngine::new(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalog::ComparisonMode;
    use crate::parser::parse_goals;

    fn family() -> Engine {
        let mut engine = Engine::new();
        engine
            .execute(
                "parent(a, b). parent(b, c). parent(x, y).
                 ancestor(X, Y) :- parent(X, Y).
                 ancestor(X, Y) :- ancestor(X, Z), parent(Z, Y).",
            )
            .unwrap();
        engine
    }

    fn ask(engine: &Engine, goals: &str) -> Vec<Bindings> {
        engine.query(&parse_goals(goals).unwrap(), None).unwrap()
    }

    #[test]
    fn test_add_fact_rejects_variables() {
        let mut engine = Engine::new();
        let err = engine
            .add_fact("edge", vec![Term::constant("a"), Term::var("X")])
            .unwrap_err();
        assert!(matches!(err, StrataError::Validation(_)));
        assert!(engine.facts().is_empty());
    }

    #[test]
    fn test_recursive_query() {
        let engine = family();
        assert_eq!(
            ask(&engine, "ancestor(a, Y)"),
            vec![
                Bindings::from_pairs([("Y", "b")]),
                Bindings::from_pairs([("Y", "c")])
            ]
        );
    }

    #[test]
    fn test_derived_facts_are_not_stored() {
        let engine = family();
        ask(&engine, "ancestor(X, Y)");
        assert_eq!(engine.facts().len(), 3);
    }

    #[test]
    fn test_query_stats() {
        let engine = family();
        let outcome = engine
            .query_with_stats(&parse_goals("ancestor(a, c)").unwrap(), None)
            .unwrap();
        assert_eq!(outcome.answers, vec![Bindings::new()]);
        assert_eq!(outcome.stats.facts_derived, 4);
    }

    #[test]
    fn test_relevance_filtering_does_not_change_answers() {
        let source = "parent(a, b). parent(b, c). likes(a, pizza).
                      ancestor(X, Y) :- parent(X, Y).
                      ancestor(X, Y) :- ancestor(X, Z), parent(Z, Y).
                      fan(X) :- likes(X, pizza).";
        let mut filtered = Engine::new();
        filtered.execute(source).unwrap();
        let mut unfiltered = Engine::with_config(EngineConfig {
            relevance_filtering: false,
            ..EngineConfig::default()
        });
        unfiltered.execute(source).unwrap();

        assert_eq!(ask(&filtered, "ancestor(X, c)"), ask(&unfiltered, "ancestor(X, c)"));

        let narrow = filtered
            .query_with_stats(&parse_goals("ancestor(X, c)").unwrap(), None)
            .unwrap();
        let broad = unfiltered
            .query_with_stats(&parse_goals("ancestor(X, c)").unwrap(), None)
            .unwrap();
        assert!(narrow.stats.facts_derived < broad.stats.facts_derived);
    }

    #[test]
    fn test_rule_creating_negative_cycle_is_not_stored() {
        let mut engine = Engine::new();
        engine.execute("p(X) :- q(X), not r(X).").unwrap();
        let err = engine.execute("r(X) :- q(X), not p(X).").unwrap_err();
        assert_eq!(err.kind(), "stratification");
        assert_eq!(engine.rules().len(), 1);
    }

    #[test]
    fn test_duplicate_rules_are_ignored() {
        let mut engine = Engine::new();
        engine.execute("p(X) :- q(X). p(X) :- q(X).").unwrap();
        assert_eq!(engine.rules().len(), 1);
    }

    #[test]
    fn test_delete() {
        let mut engine = family();
        assert!(engine.delete(&parse_goals("parent(a, X)").unwrap(), None).unwrap());
        assert!(!engine.delete(&parse_goals("parent(a, X)").unwrap(), None).unwrap());
        assert!(ask(&engine, "ancestor(a, Y)").is_empty());
        assert_eq!(ask(&engine, "ancestor(x, Y)").len(), 1);
    }

    #[test]
    fn test_delete_only_touches_stored_facts() {
        let mut engine = family();
        assert!(!engine.delete(&parse_goals("ancestor(a, c)").unwrap(), None).unwrap());
        assert_eq!(engine.facts().len(), 3);
    }

    #[test]
    fn test_execute_wraps_errors_with_line() {
        let mut engine = Engine::new();
        let err = engine.execute("a(1).\nb(X).\n").unwrap_err();
        match err {
            StrataError::Statement { line, source } => {
                assert_eq!(line, 2);
                assert!(matches!(*source, StrataError::Validation(_)));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_execute_returns_last_query() {
        let mut engine = Engine::new();
        let answers = engine.execute("n(1). n(2). n(X)? n(X), X > 1?").unwrap();
        assert_eq!(answers, Some(vec![Bindings::from_pairs([("X", "2")])]));
    }

    #[test]
    fn test_strict_comparisons() {
        let mut engine = Engine::with_config(EngineConfig {
            comparison_mode: ComparisonMode::Strict,
            ..EngineConfig::default()
        });
        engine.execute("v(apple). v(3).").unwrap();
        let err = engine
            .query(&parse_goals("v(X), X > 1").unwrap(), None)
            .unwrap_err();
        assert!(matches!(err, StrataError::Evaluation(_)));
    }

    #[test]
    fn test_display_round_trips() {
        let engine = family();
        let dump = engine.to_string();
        assert!(dump.starts_with("% Facts:\nparent(a, b).\n"));
        assert!(dump.contains("% Rules:\nancestor(X, Y) :- parent(X, Y).\n"));

        let mut copy = Engine::new();
        copy.execute(&dump).unwrap();
        assert_eq!(copy.to_string(), dump);
    }

    #[test]
    fn test_validate() {
        assert!(family().validate().is_ok());
    }

    #[test]
    fn test_shared_engine_across_threads() {
        let shared = SharedEngine::new(family());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared
                        .query(&parse_goals("ancestor(a, Y)").unwrap(), None)
                        .unwrap()
                        .len()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }

        shared.fact(Literal::from_tokens("parent", ["c", "d"])).unwrap();
        assert_eq!(shared.read(|engine| engine.facts().len()), 4);
    }
}
