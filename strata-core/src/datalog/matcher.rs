//! Goal matching against a fact set
//!
//! Goals are solved left to right. Each branch of the search owns a child
//! frame in a [`BindingArena`]; frames are discarded as soon as the branch is
//! finished, so the arena never grows beyond the current search depth plus the
//! frame being tried.

use super::bindings::{BindingArena, Bindings, FrameId};
use super::builtins::{self, ComparisonMode};
use super::fact_set::FactSet;
use super::types::Literal;
use super::unification::unify;
use crate::error::Result;

/// Solves goal lists against a fixed set of facts
pub struct GoalMatcher<'f> {
    facts: &'f FactSet,
    mode: ComparisonMode,
}

impl<'f> GoalMatcher<'f> {
    /// Create a matcher over `facts`
    pub fn new(facts: &'f FactSet, mode: ComparisonMode) -> Self {
        GoalMatcher { facts, mode }
    }

    /// Find every binding that satisfies all of `goals`
    ///
    /// Answers include the `seed` bindings. An empty goal list has no answers.
    pub fn solve(&self, goals: &[Literal], seed: Option<&Bindings>) -> Result<Vec<Bindings>> {
        let mut answers = Vec::new();
        if goals.is_empty() {
            return Ok(answers);
        }

        let empty = Bindings::new();
        let mut arena = BindingArena::new();
        let root = arena.root(seed.unwrap_or(&empty));
        self.match_goals(goals, &mut arena, root, &mut answers)?;
        Ok(answers)
    }

    fn match_goals(
        &self,
        goals: &[Literal],
        arena: &mut BindingArena,
        frame: FrameId,
        answers: &mut Vec<Bindings>,
    ) -> Result<()> {
        let Some((goal, rest)) = goals.split_first() else {
            answers.push(arena.flatten(frame));
            return Ok(());
        };
        let mark = arena.mark();

        if goal.is_builtin() {
            let child = arena.push(frame);
            let holds = builtins::evaluate(goal, &mut arena.scope(child), self.mode)?;
            if holds != goal.is_negated() {
                self.match_goals(rest, arena, child, answers)?;
            }
            arena.truncate(mark);
            return Ok(());
        }

        let pattern = goal.substitute(&arena.view(frame));

        if goal.is_negated() {
            for fact in self.facts.candidates(&pattern) {
                let child = arena.push(frame);
                let found = unify(&pattern, fact, &mut arena.scope(child));
                arena.truncate(mark);
                if found {
                    return Ok(());
                }
            }
            return self.match_goals(rest, arena, frame, answers);
        }

        for fact in self.facts.candidates(&pattern) {
            let child = arena.push(frame);
            if unify(&pattern, fact, &mut arena.scope(child)) {
                self.match_goals(rest, arena, child, answers)?;
            }
            arena.truncate(mark);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrataError;

    fn facts() -> FactSet {
        [
            Literal::from_tokens("a", ["1"]),
            Literal::from_tokens("a", ["2"]),
            Literal::from_tokens("b", ["1"]),
            Literal::from_tokens("edge", ["x", "y"]),
            Literal::from_tokens("edge", ["y", "z"]),
        ]
        .into_iter()
        .collect()
    }

    fn solve(goals: &[Literal]) -> Result<Vec<Bindings>> {
        let facts = facts();
        GoalMatcher::new(&facts, ComparisonMode::Permissive).solve(goals, None)
    }

    #[test]
    fn test_empty_goals_have_no_answers() {
        assert!(solve(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_join() {
        let answers = solve(&[
            Literal::from_tokens("edge", ["X", "Y"]),
            Literal::from_tokens("edge", ["Y", "Z"]),
        ])
        .unwrap();
        assert_eq!(
            answers,
            vec![Bindings::from_pairs([("X", "x"), ("Y", "y"), ("Z", "z")])]
        );
    }

    #[test]
    fn test_negation_as_failure() {
        let answers = solve(&[
            Literal::from_tokens("a", ["X"]),
            Literal::from_tokens("b", ["X"]).negate(),
        ])
        .unwrap();
        assert_eq!(answers, vec![Bindings::from_pairs([("X", "2")])]);
    }

    #[test]
    fn test_ground_goal_yields_single_empty_answer() {
        let answers = solve(&[Literal::from_tokens("a", ["1"])]).unwrap();
        assert_eq!(answers, vec![Bindings::new()]);

        let answers = solve(&[Literal::from_tokens("a", ["3"])]).unwrap();
        assert!(answers.is_empty());
    }

    #[test]
    fn test_builtins_filter_and_bind() {
        let answers = solve(&[
            Literal::from_tokens("a", ["X"]),
            Literal::from_tokens(">", ["X", "1"]),
        ])
        .unwrap();
        assert_eq!(answers, vec![Bindings::from_pairs([("X", "2")])]);

        let answers = solve(&[
            Literal::from_tokens("a", ["X"]),
            Literal::from_tokens("FN_TIMES", ["X", "10", "Y"]),
        ])
        .unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[1].get_text("Y"), Some("20"));
    }

    #[test]
    fn test_negated_builtin() {
        let answers = solve(&[
            Literal::from_tokens("a", ["X"]),
            Literal::from_tokens("=", ["X", "1"]).negate(),
        ])
        .unwrap();
        assert_eq!(answers, vec![Bindings::from_pairs([("X", "2")])]);
    }

    #[test]
    fn test_seed_bindings_are_applied_and_returned() {
        let facts = facts();
        let seed = Bindings::from_pairs([("X", "y")]);
        let answers = GoalMatcher::new(&facts, ComparisonMode::Permissive)
            .solve(&[Literal::from_tokens("edge", ["X", "Y"])], Some(&seed))
            .unwrap();
        assert_eq!(answers, vec![Bindings::from_pairs([("X", "y"), ("Y", "z")])]);
    }

    #[test]
    fn test_unbound_builtin_is_a_fault() {
        let err = solve(&[
            Literal::from_tokens("<", ["X", "1"]),
            Literal::from_tokens("a", ["X"]),
        ])
        .unwrap_err();
        assert!(matches!(err, StrataError::Evaluation(_)));
    }
}
