//! Datalog evaluation for Strata
//!
//! This module holds the engine's reasoning core:
//!
//! - **Terms, literals and rules**: immutable values with Arc-shared text
//! - **Indexed fact sets**: lookups by predicate and by constant position
//! - **Scoped bindings**: arena frames so search branches never interfere
//! - **Stratified negation**: rules are ordered so negated predicates are complete first
//! - **Semi-naive evaluation**: only rules touched by new facts run again
//! - **Built-ins**: comparisons and `FN_` arithmetic evaluated during matching
//!
//! Evaluation strategy:
//! - Bottom-up fixpoint per stratum, then top-down matching of the query goals
//! - Negation as failure against the saturated fact set

pub mod bindings;
pub mod builtins;
pub mod fact_set;
pub mod matcher;
pub mod provider;
pub mod semi_naive;
pub mod stratification;
pub mod types;
pub mod unification;
pub mod validation;

// Re-export main types
pub use bindings::{BindingArena, BindingEnv, BindingEnvMut, Bindings, FrameId, Scope, ScopeView};
pub use builtins::{format_number, parse_number, ComparisonMode};
pub use fact_set::FactSet;
pub use matcher::GoalMatcher;
pub use provider::{FactProvider, MemoryProvider};
pub use semi_naive::{EvaluationStats, SemiNaiveEvaluator};
pub use stratification::{stratify, Stratification};
pub use types::{reorder_goals, BuiltinFn, CompareOp, Literal, LiteralKind, Rule, Term};
pub use unification::{unify, unify_terms};
pub use validation::{validate_fact, validate_rule};
