//! Insertion-time checks for facts and rules
//!
//! A rule is safe when every variable is bound by a positive literal before it
//! is needed: in a negated literal, in a comparison, as a function input, or in
//! the head. `=` and function outputs are the exceptions, since they can bind.
//! The body is walked in canonical order, which is the order evaluation uses.

use super::types::{BuiltinFn, CompareOp, Literal, LiteralKind, Rule, Term, FUNCTION_PREFIX};
use crate::error::{Result, StrataError};
use std::collections::HashSet;

fn invalid(message: String) -> StrataError {
    StrataError::Validation(message)
}

/// Check that `fact` can be stored: ground, positive, not a built-in
pub fn validate_fact(fact: &Literal) -> Result<()> {
    if fact.is_negated() {
        return Err(invalid(format!("Fact {} may not be negated", fact)));
    }
    if fact.is_builtin() {
        return Err(invalid(format!("Fact {} may not be a built-in predicate", fact)));
    }
    if !fact.is_ground() {
        return Err(invalid(format!("Fact {} is not ground", fact)));
    }
    Ok(())
}

fn check_arity(literal: &Literal) -> Result<()> {
    if literal.kind() == LiteralKind::Ordinary && literal.predicate().starts_with(FUNCTION_PREFIX) {
        return Err(invalid(format!("Unknown function {}", literal.predicate())));
    }
    match literal.kind() {
        LiteralKind::Compare(op) if literal.arity() != 2 => Err(invalid(format!(
            "Operator {} must have exactly two operands",
            op
        ))),
        LiteralKind::Function(function) if literal.arity() != function.arity() => {
            Err(invalid(format!(
                "Function {}{} expects {} operands",
                FUNCTION_PREFIX,
                function.name(),
                function.arity()
            )))
        }
        _ => Ok(()),
    }
}

fn require_bound(term: &Term, bound: &HashSet<&str>, literal: &Literal) -> Result<()> {
    match term.as_variable() {
        Some(var) if !bound.contains(var) => {
            Err(invalid(format!("Unbound variable {} in {}", var, literal)))
        }
        _ => Ok(()),
    }
}

fn both_unbound(terms: &[Term], bound: &HashSet<&str>) -> bool {
    terms
        .iter()
        .all(|t| t.as_variable().is_some_and(|v| !bound.contains(v)))
}

/// Check rule safety. Returns the first problem found.
pub fn validate_rule(rule: &Rule) -> Result<()> {
    let head = rule.head();
    if head.is_negated() {
        return Err(invalid(format!("Head of rule {} may not be negated", rule)));
    }
    if head.is_builtin() || head.predicate().starts_with(FUNCTION_PREFIX) {
        return Err(invalid(format!(
            "Head of rule {} may not be a built-in predicate",
            rule
        )));
    }
    if rule.body().is_empty() {
        return Err(invalid(format!("Rule {} has an empty body", rule)));
    }

    let mut bound: HashSet<&str> = HashSet::new();
    for literal in rule.body() {
        check_arity(literal)?;

        if literal.is_negated() {
            for var in literal.variables() {
                if !bound.contains(var.as_ref()) {
                    return Err(invalid(format!(
                        "Variable {} of rule {} must appear in at least one positive expression",
                        var, rule
                    )));
                }
            }
            continue;
        }

        match literal.kind() {
            LiteralKind::Ordinary => {}
            LiteralKind::Compare(CompareOp::Eq) => {
                if both_unbound(literal.terms(), &bound) {
                    return Err(invalid(format!(
                        "Both variables of '=' are unbound in clause {}",
                        literal
                    )));
                }
            }
            LiteralKind::Compare(_) => {
                for term in literal.terms() {
                    require_bound(term, &bound, literal)?;
                }
            }
            LiteralKind::Function(BuiltinFn::Same) => {
                if both_unbound(literal.terms(), &bound) {
                    return Err(invalid(format!("Both operands of {} are unbound", literal)));
                }
            }
            LiteralKind::Function(function) => {
                let inputs = if function.binds_output() {
                    &literal.terms()[..literal.arity() - 1]
                } else {
                    literal.terms()
                };
                for term in inputs {
                    require_bound(term, &bound, literal)?;
                }
            }
        }

        bound.extend(literal.variables().map(|v| v.as_ref()));
    }

    for var in head.variables() {
        if !bound.contains(var.as_ref()) {
            return Err(invalid(format!(
                "Variable {} of rule {} must appear in at least one positive expression",
                var, rule
            )));
        }
    }

    Ok(())
}
