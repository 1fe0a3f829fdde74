//! Unification of a goal pattern against a candidate literal
//!
//! The pattern is usually a goal from a rule body and the candidate a stored
//! fact, but candidates may carry variables too (rule heads during delete).

use super::bindings::BindingEnvMut;
use super::types::{Literal, Term};

/// Unify two terms, extending `env` on success
///
/// On failure `env` may hold partial bindings, so callers unify into a
/// scratch frame they can discard.
pub fn unify_terms<E: BindingEnvMut + ?Sized>(pattern: &Term, candidate: &Term, env: &mut E) -> bool {
    // A bound candidate variable stands for its value
    let candidate = env.resolve(candidate).clone();

    match (pattern, &candidate) {
        (Term::Variable(var), _) => match env.lookup(var) {
            Some(bound) => *bound == candidate,
            None => {
                if candidate.as_variable() != Some(var.as_ref()) {
                    env.bind(var.clone(), candidate);
                }
                true
            }
        },
        (Term::Constant(_), Term::Variable(var)) => {
            env.bind(var.clone(), pattern.clone());
            true
        }
        (Term::Constant(a), Term::Constant(b)) => a == b,
    }
}

/// Unify a pattern literal with a candidate literal
///
/// Predicates and arities must be equal; terms are unified pairwise.
/// Negation flags are ignored.
pub fn unify<E: BindingEnvMut + ?Sized>(pattern: &Literal, candidate: &Literal, env: &mut E) -> bool {
    if pattern.predicate() != candidate.predicate() || pattern.arity() != candidate.arity() {
        return false;
    }

    pattern
        .terms()
        .iter()
        .zip(candidate.terms())
        .all(|(p, c)| unify_terms(p, c, env))
}
