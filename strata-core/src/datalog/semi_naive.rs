//! Semi-naive bottom-up evaluation
//!
//! Rules are evaluated stratum by stratum. Within a stratum every rule runs
//! once; after that, a rule only runs again if a fact derived in the previous
//! round has a predicate its body mentions. The stratum is saturated when a
//! round derives nothing new.

use super::builtins::ComparisonMode;
use super::fact_set::FactSet;
use super::matcher::GoalMatcher;
use super::stratification::stratify;
use super::types::Rule;
use crate::error::{Result, StrataError};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, trace};

/// Statistics for evaluation performance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStats {
    /// Non-empty strata that were run
    pub strata_evaluated: usize,
    /// Rounds across all strata, including the final empty one per stratum
    pub iterations: usize,
    /// Rule bodies matched
    pub rule_applications: usize,
    /// New facts added to the working set
    pub facts_derived: usize,
    /// Wall-clock time of the whole expansion
    pub evaluation_time_ms: f64,
}

/// Derives every fact entailed by a rule set
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiNaiveEvaluator {
    mode: ComparisonMode,
}

impl SemiNaiveEvaluator {
    /// Create an evaluator using `mode` for ordered comparisons
    pub fn new(mode: ComparisonMode) -> Self {
        SemiNaiveEvaluator { mode }
    }

    /// Add all facts derivable from `rules` to `facts`
    #[instrument(skip_all, fields(rules = rules.len(), facts = facts.len()))]
    pub fn expand(&self, facts: &mut FactSet, rules: &[Arc<Rule>]) -> Result<EvaluationStats> {
        let start = Instant::now();
        let mut stats = EvaluationStats::default();

        let stratification = stratify(rules)?;
        for (index, stratum) in stratification.strata.iter().enumerate() {
            if stratum.is_empty() {
                continue;
            }
            debug!(stratum = index, rules = stratum.len(), "Evaluating stratum");
            self.expand_stratum(facts, stratum, &mut stats)?;
            stats.strata_evaluated += 1;
        }

        stats.evaluation_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            derived = stats.facts_derived,
            iterations = stats.iterations,
            "Expansion complete"
        );
        Ok(stats)
    }

    fn expand_stratum(
        &self,
        facts: &mut FactSet,
        rules: &[Arc<Rule>],
        stats: &mut EvaluationStats,
    ) -> Result<()> {
        let dependents = dependent_rules(rules);
        let mut active: Vec<usize> = (0..rules.len()).collect();

        loop {
            stats.iterations += 1;
            let mut delta = facts.empty_like();

            let matcher = GoalMatcher::new(facts, self.mode);
            for &index in &active {
                let rule = &rules[index];
                stats.rule_applications += 1;
                for answer in matcher.solve(rule.body(), None)? {
                    let derived = rule.head().substitute(&answer);
                    if !derived.is_ground() {
                        return Err(StrataError::Evaluation(format!(
                            "Rule {} derived non-ground fact {}",
                            rule, derived
                        )));
                    }
                    if !facts.contains(&derived) {
                        delta.add(derived);
                    }
                }
            }

            if delta.is_empty() {
                return Ok(());
            }
            trace!(
                active = active.len(),
                new_facts = delta.len(),
                "Semi-naive round"
            );

            let next: BTreeSet<usize> = delta
                .predicates()
                .filter_map(|predicate| dependents.get(&**predicate))
                .flatten()
                .copied()
                .collect();
            active = next.into_iter().collect();

            stats.facts_derived += facts.extend(delta.iter().cloned());
        }
    }
}

/// Map each body predicate to the indices of the rules that mention it
fn dependent_rules(rules: &[Arc<Rule>]) -> AHashMap<&str, Vec<usize>> {
    let mut dependents: AHashMap<&str, Vec<usize>> = AHashMap::new();
    for (index, rule) in rules.iter().enumerate() {
        for predicate in rule.dependencies() {
            dependents.entry(predicate).or_default().push(index);
        }
    }
    dependents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalog::Literal;

    fn rule(head: (&str, &[&str]), body: &[(&str, &[&str])]) -> Arc<Rule> {
        Arc::new(Rule::new(
            Literal::from_tokens(head.0, head.1),
            body.iter().map(|(p, t)| Literal::from_tokens(*p, *t)).collect(),
        ))
    }

    fn chain(len: usize) -> FactSet {
        (0..len)
            .map(|i| Literal::from_tokens("edge", [i.to_string(), (i + 1).to_string()]))
            .collect()
    }

    fn closure_rules() -> Vec<Arc<Rule>> {
        vec![
            rule(("path", &["X", "Y"]), &[("edge", &["X", "Y"])]),
            rule(
                ("path", &["X", "Z"]),
                &[("path", &["X", "Y"]), ("edge", &["Y", "Z"])],
            ),
        ]
    }

    #[test]
    fn test_transitive_closure() {
        let mut facts = chain(4);
        let stats = SemiNaiveEvaluator::default()
            .expand(&mut facts, &closure_rules())
            .unwrap();

        // 4 edges give 4 + 3 + 2 + 1 paths
        assert_eq!(facts.by_predicate("path").len(), 10);
        assert_eq!(stats.facts_derived, 10);
        assert!(facts.contains(&Literal::from_tokens("path", ["0", "4"])));
    }

    #[test]
    fn test_expand_is_idempotent() {
        let rules = closure_rules();
        let mut once = chain(5);
        SemiNaiveEvaluator::default().expand(&mut once, &rules).unwrap();

        let mut twice = once.clone();
        let stats = SemiNaiveEvaluator::default().expand(&mut twice, &rules).unwrap();
        assert_eq!(stats.facts_derived, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_negation_across_strata() {
        let mut facts: FactSet = [
            Literal::from_tokens("node", ["a"]),
            Literal::from_tokens("node", ["b"]),
            Literal::from_tokens("node", ["c"]),
            Literal::from_tokens("edge", ["a", "b"]),
        ]
        .into_iter()
        .collect();

        let rules = vec![
            Arc::new(Rule::new(
                Literal::from_tokens("isolated", ["X"]),
                vec![
                    Literal::from_tokens("node", ["X"]),
                    Literal::from_tokens("linked", ["X"]).negate(),
                ],
            )),
            rule(("linked", &["X"]), &[("edge", &["X", "Y"])]),
            rule(("linked", &["Y"]), &[("edge", &["X", "Y"])]),
        ];

        SemiNaiveEvaluator::default().expand(&mut facts, &rules).unwrap();
        let isolated: Vec<String> = facts
            .by_predicate("isolated")
            .iter()
            .map(|l| l.to_string())
            .collect();
        assert_eq!(isolated, vec!["isolated(c)"]);
    }

    #[test]
    fn test_unstratifiable_rules_fail() {
        let rules = vec![Arc::new(Rule::new(
            Literal::from_tokens("p", ["X"]),
            vec![
                Literal::from_tokens("q", ["X"]),
                Literal::from_tokens("p", ["X"]).negate(),
            ],
        ))];
        let mut facts: FactSet = [Literal::from_tokens("q", ["a"])].into_iter().collect();
        assert!(SemiNaiveEvaluator::default().expand(&mut facts, &rules).is_err());
    }

    #[test]
    fn test_arithmetic_rules() {
        let mut facts: FactSet = [Literal::from_tokens("n", ["1"])].into_iter().collect();
        let rules = vec![rule(
            ("n", &["Y"]),
            &[("n", &["X"]), ("<", &["X", "5"]), ("FN_PLUS", &["X", "1", "Y"])],
        )];

        SemiNaiveEvaluator::default().expand(&mut facts, &rules).unwrap();
        assert_eq!(facts.by_predicate("n").len(), 5);
        assert!(facts.contains(&Literal::from_tokens("n", ["5"])));
    }
}
