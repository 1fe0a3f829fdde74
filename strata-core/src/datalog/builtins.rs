//! Built-in predicates: infix comparisons and `FN_` functions
//!
//! Built-ins are evaluated against the current bindings instead of being
//! matched against facts. `=` and the output slot of value-producing functions
//! may bind a variable; everything else only tests.

use super::bindings::BindingEnvMut;
use super::types::{BuiltinFn, CompareOp, Literal, LiteralKind, Term};
use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How ordered comparisons treat operands that are not numbers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Non-numeric operands compare as 0
    #[default]
    Permissive,
    /// Non-numeric operands are an evaluation fault
    Strict,
}

/// Parse text matching `[+-]?\d+(\.\d*)?([Ee][+-]?\d+)?` as a number
pub fn parse_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    let digits = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
        *i - start
    };

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    if digits(&mut i) == 0 {
        return None;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        digits(&mut i);
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if digits(&mut i) == 0 {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    text.parse().ok()
}

/// Render a computed value: integral values print without a fraction
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Evaluate a built-in literal, ignoring its negation flag
///
/// Returns whether the built-in holds; `=` and function outputs may bind a
/// variable in `env`. Errors are evaluation faults such as unbound operands.
pub fn evaluate<E: BindingEnvMut + ?Sized>(
    literal: &Literal,
    env: &mut E,
    mode: ComparisonMode,
) -> Result<bool> {
    if let Some(expected) = literal.kind().expected_arity() {
        if literal.arity() != expected {
            return Err(StrataError::Evaluation(format!(
                "Built-in {} expects {} operands",
                literal, expected
            )));
        }
    }

    match literal.kind() {
        LiteralKind::Ordinary => Err(StrataError::Evaluation(format!(
            "{} is not a built-in predicate",
            literal
        ))),
        LiteralKind::Compare(op) => compare(op, literal, env, mode),
        LiteralKind::Function(function) => apply_function(function, literal, env, mode),
    }
}

fn compare<E: BindingEnvMut + ?Sized>(
    op: CompareOp,
    literal: &Literal,
    env: &mut E,
    mode: ComparisonMode,
) -> Result<bool> {
    let left = env.resolve(&literal.terms()[0]).clone();
    let right = env.resolve(&literal.terms()[1]).clone();

    if op == CompareOp::Eq {
        return equate(left, right, literal, env);
    }

    let (left, right) = (bound_text(&left, literal)?, bound_text(&right, literal)?);
    match op {
        CompareOp::Ne => Ok(!values_equal(left, right)),
        CompareOp::Lt => ordered(left, right, literal, mode, Ordering::is_lt),
        CompareOp::Le => ordered(left, right, literal, mode, Ordering::is_le),
        CompareOp::Gt => ordered(left, right, literal, mode, Ordering::is_gt),
        CompareOp::Ge => ordered(left, right, literal, mode, Ordering::is_ge),
        CompareOp::Eq => unreachable!("handled above"),
    }
}

/// `=`: bind whichever side is unbound, or compare two values
fn equate<E: BindingEnvMut + ?Sized>(
    left: Term,
    right: Term,
    literal: &Literal,
    env: &mut E,
) -> Result<bool> {
    match (left, right) {
        (Term::Variable(_), Term::Variable(_)) => Err(StrataError::Evaluation(format!(
            "Both operands of {} are unbound",
            literal
        ))),
        (Term::Variable(var), value) | (value, Term::Variable(var)) => {
            env.bind(var, value);
            Ok(true)
        }
        (Term::Constant(a), Term::Constant(b)) => Ok(values_equal(&a, &b)),
    }
}

fn bound_text<'t>(term: &'t Term, literal: &Literal) -> Result<&'t str> {
    match term {
        Term::Constant(text) => Ok(text),
        Term::Variable(var) => Err(StrataError::Evaluation(format!(
            "Unbound variable {} in {}",
            var, literal
        ))),
    }
}

/// Numbers compare by value, anything else by text
fn values_equal(left: &str, right: &str) -> bool {
    match (parse_number(left), parse_number(right)) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn as_number(text: &str, literal: &Literal, mode: ComparisonMode) -> Result<f64> {
    match (parse_number(text), mode) {
        (Some(value), _) => Ok(value),
        (None, ComparisonMode::Permissive) => Ok(0.0),
        (None, ComparisonMode::Strict) => Err(StrataError::Evaluation(format!(
            "Non-numeric operand {} in {}",
            text, literal
        ))),
    }
}

fn ordered(
    left: &str,
    right: &str,
    literal: &Literal,
    mode: ComparisonMode,
    test: fn(Ordering) -> bool,
) -> Result<bool> {
    let a = as_number(left, literal, mode)?;
    let b = as_number(right, literal, mode)?;
    Ok(a.partial_cmp(&b).is_some_and(test))
}

fn numeric_input(term: &Term, literal: &Literal) -> Result<f64> {
    let text = bound_text(term, literal)?;
    parse_number(text).ok_or_else(|| {
        StrataError::Evaluation(format!("Non-numeric operand {} in {}", text, literal))
    })
}

fn apply_function<E: BindingEnvMut + ?Sized>(
    function: BuiltinFn,
    literal: &Literal,
    env: &mut E,
    mode: ComparisonMode,
) -> Result<bool> {
    let operands: Vec<Term> = literal
        .terms()
        .iter()
        .map(|t| env.resolve(t).clone())
        .collect();

    let value = match function {
        BuiltinFn::Same => {
            let [a, b] = pair(operands);
            return equate(a, b, literal, env);
        }
        BuiltinFn::Distinct => {
            let [a, b] = pair(operands);
            return Ok(!values_equal(bound_text(&a, literal)?, bound_text(&b, literal)?));
        }
        BuiltinFn::Gt | BuiltinFn::Lt | BuiltinFn::Geq | BuiltinFn::Leq => {
            let test: fn(Ordering) -> bool = match function {
                BuiltinFn::Gt => Ordering::is_gt,
                BuiltinFn::Lt => Ordering::is_lt,
                BuiltinFn::Geq => Ordering::is_ge,
                _ => Ordering::is_le,
            };
            let [a, b] = pair(operands);
            return ordered(bound_text(&a, literal)?, bound_text(&b, literal)?, literal, mode, test);
        }
        BuiltinFn::Plus
        | BuiltinFn::Minus
        | BuiltinFn::Times
        | BuiltinFn::Div
        | BuiltinFn::Mod
        | BuiltinFn::Pow => {
            let a = numeric_input(&operands[0], literal)?;
            let b = numeric_input(&operands[1], literal)?;
            match function {
                BuiltinFn::Plus => Some(a + b),
                BuiltinFn::Minus => Some(a - b),
                BuiltinFn::Times => Some(a * b),
                BuiltinFn::Div if b == 0.0 => None,
                BuiltinFn::Div => Some(a / b),
                BuiltinFn::Mod if b == 0.0 => None,
                BuiltinFn::Mod => Some(a % b),
                _ => Some(a.powf(b)),
            }
        }
        _ => {
            let a = numeric_input(&operands[0], literal)?;
            Some(match function {
                BuiltinFn::Exp => a.exp(),
                BuiltinFn::Sqrt => a.sqrt(),
                BuiltinFn::Log => a.ln(),
                BuiltinFn::Ceil => a.ceil(),
                BuiltinFn::Floor => a.floor(),
                BuiltinFn::Round => a.round(),
                _ => a.abs(),
            })
        }
    };

    // Undefined results (division by zero, sqrt of a negative) make the goal fail
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return Ok(false);
    };

    match operands.last() {
        Some(Term::Variable(var)) => {
            env.bind(var.clone(), Term::constant(format_number(value)));
            Ok(true)
        }
        Some(Term::Constant(expected)) => Ok(parse_number(expected) == Some(value)),
        None => Ok(false),
    }
}

fn pair(operands: Vec<Term>) -> [Term; 2] {
    let mut operands = operands.into_iter();
    match (operands.next(), operands.next()) {
        (Some(a), Some(b)) => [a, b],
        _ => unreachable!("arity checked before dispatch"),
    }
}
