//! Stratification of rules with negation
//!
//! Each head predicate gets a stratum number: the deepest chain of negations
//! beneath it. Rules are evaluated stratum by stratum so that a negated
//! predicate is complete before anything reads it. A predicate that reaches
//! itself through a negation cannot be stratified and is reported with the
//! route that closes the loop.
//!
//! Strata are computed by relaxing the predicate dependency graph until it
//! settles, so the cost is polynomial in the size of the rule set.

use super::types::Rule;
use crate::error::{Result, StrataError};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Rules grouped into evaluation order
#[derive(Debug, Clone, Default)]
pub struct Stratification {
    /// Rules per stratum, lowest first. The last entry holds every rule.
    pub strata: Vec<Vec<Arc<Rule>>>,
    /// Stratum assigned to each head predicate
    pub predicate_strata: HashMap<Arc<str>, usize>,
}

impl Stratification {
    /// Stratum of a head predicate, if any rule defines it
    pub fn stratum_of(&self, predicate: &str) -> Option<usize> {
        self.predicate_strata.get(predicate).copied()
    }

    /// Number of strata, counting the final catch-all
    pub fn len(&self) -> usize {
        self.strata.len()
    }

    /// True when there are no rules at all
    pub fn is_empty(&self) -> bool {
        self.predicate_strata.is_empty()
    }
}

/// An edge from a head predicate to a predicate its body reads
#[derive(Debug, Clone, Copy)]
struct Dependency {
    from: usize,
    to: usize,
    negated: bool,
}

/// Predicate dependency graph, nodes numbered in order of first appearance
#[derive(Debug, Default)]
struct DependencyGraph {
    names: Vec<Arc<str>>,
    ids: HashMap<Arc<str>, usize>,
    edges: Vec<Dependency>,
}

impl DependencyGraph {
    fn from_rules(rules: &[Arc<Rule>]) -> Self {
        let mut graph = DependencyGraph::default();
        for rule in rules {
            let from = graph.node(rule.head().predicate_arc());
            for literal in rule.body().iter().filter(|l| !l.is_builtin()) {
                let to = graph.node(literal.predicate_arc());
                graph.edges.push(Dependency { from, to, negated: literal.is_negated() });
            }
        }
        graph
    }

    fn node(&mut self, predicate: &Arc<str>) -> usize {
        if let Some(&id) = self.ids.get(predicate) {
            return id;
        }
        let id = self.names.len();
        self.names.push(predicate.clone());
        self.ids.insert(predicate.clone(), id);
        id
    }

    /// Longest count of negations below each predicate, or `None` when some
    /// cycle passes through a negation
    fn levels(&self) -> Option<Vec<usize>> {
        let mut levels = vec![0; self.names.len()];
        // Without a negative cycle no level can exceed the number of predicates
        for _ in 0..=self.names.len() {
            let mut changed = false;
            for edge in &self.edges {
                let required = levels[edge.to] + usize::from(edge.negated);
                if required > levels[edge.from] {
                    levels[edge.from] = required;
                    changed = true;
                }
            }
            if !changed {
                return Some(levels);
            }
        }
        None
    }

    /// Shortest path of edges leading from `start` to `goal`
    fn path(&self, start: usize, goal: usize) -> Option<Vec<Dependency>> {
        let mut reached: Vec<Option<Dependency>> = vec![None; self.names.len()];
        let mut seen = vec![false; self.names.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;

        while let Some(node) = queue.pop_front() {
            if node == goal {
                let mut path = Vec::new();
                let mut at = goal;
                while at != start {
                    let edge = reached[at]?;
                    path.push(edge);
                    at = edge.from;
                }
                path.reverse();
                return Some(path);
            }
            for edge in self.edges.iter().filter(|e| e.from == node) {
                if !seen[edge.to] {
                    seen[edge.to] = true;
                    reached[edge.to] = Some(*edge);
                    queue.push_back(edge.to);
                }
            }
        }
        None
    }

    /// Describe the first negation that closes a cycle
    ///
    /// The route reads from the recursive predicate back through its readers,
    /// with `~` marking a predicate that was read under negation.
    fn negative_recursion(&self) -> StrataError {
        for edge in self.edges.iter().filter(|e| e.negated) {
            let Some(back) = self.path(edge.to, edge.from) else {
                continue;
            };
            let predicate = &self.names[edge.from];

            // Predicates visited after the head, each with how it was reached
            let mut visited = Vec::new();
            if edge.to != edge.from {
                visited.push((edge.to, true));
                visited.extend(back[..back.len() - 1].iter().map(|e| (e.to, e.negated)));
            }

            let mut route = predicate.to_string();
            for (node, negated) in visited.iter().rev() {
                route.push_str(if *negated { " <- ~" } else { " <- " });
                route.push_str(&self.names[*node]);
            }
            route.push_str(" <- ");
            route.push_str(predicate);

            return StrataError::Stratification(format!(
                "Program is not stratified - predicate {} has a negative recursion: {}",
                predicate, route
            ));
        }
        StrataError::Stratification("Program is not stratified - negative recursion".to_string())
    }
}

/// Assign strata to `rules`, failing on negative recursion
pub fn stratify(rules: &[Arc<Rule>]) -> Result<Stratification> {
    let graph = DependencyGraph::from_rules(rules);
    let levels = graph.levels().ok_or_else(|| graph.negative_recursion())?;

    let mut out = Stratification::default();
    for rule in rules {
        let predicate = rule.head().predicate_arc();
        let stratum = graph.ids.get(predicate).map(|&id| levels[id]).unwrap_or(0);
        out.predicate_strata.insert(predicate.clone(), stratum);

        if out.strata.len() <= stratum {
            out.strata.resize_with(stratum + 1, Vec::new);
        }
        out.strata[stratum].push(rule.clone());
    }

    // Catch-all pass so that rules spanning strata reach their fixpoint
    out.strata.push(rules.to_vec());
    Ok(out)
}
