//! Core Datalog data structures
//!
//! This module defines the fundamental value types of the engine:
//! - Terms (variables and constants)
//! - Literals (predicates applied to terms, possibly negated or built-in)
//! - Rules (Horn clauses with a canonically ordered body)
//!
//! Design principles:
//! - Arc-based text for cheap cloning between fact sets
//! - Built-in classification decided once, at construction
//! - Immutable once built; rules keep their body order as an invariant

use super::bindings::BindingEnv;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// A term in Datalog (variable or constant)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    /// Variable (e.g., X, Person)
    Variable(Arc<str>),
    /// Constant value (e.g., alice, 42, "Hello World")
    Constant(Arc<str>),
}

impl Term {
    /// Create a variable term
    pub fn var(name: impl AsRef<str>) -> Self {
        Term::Variable(Arc::from(name.as_ref()))
    }

    /// Create a constant term
    pub fn constant(value: impl AsRef<str>) -> Self {
        Term::Constant(Arc::from(value.as_ref()))
    }

    /// Classify a source token.
    ///
    /// Tokens starting with an uppercase letter are variables. A token wrapped
    /// in matching quotes is always a constant holding the unquoted text, so
    /// `"Alice"` is a constant even though it starts with a capital.
    pub fn parse(token: &str) -> Self {
        if let Some(inner) = strip_quotes(token) {
            return Term::constant(inner);
        }
        if token.chars().next().is_some_and(char::is_uppercase) {
            Term::var(token)
        } else {
            Term::constant(token)
        }
    }

    /// Check if term is a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Check if term is a constant
    pub fn is_constant(&self) -> bool {
        matches!(self, Term::Constant(_))
    }

    /// Get variable name if this is a variable
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// Get constant value if this is a constant
    pub fn as_constant(&self) -> Option<&str> {
        match self {
            Term::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Raw text of the term, without quoting
    pub fn text(&self) -> &str {
        match self {
            Term::Variable(text) | Term::Constant(text) => text,
        }
    }

    /// Replace a bound variable by its value; everything else is returned as is
    pub fn substitute<E: BindingEnv + ?Sized>(&self, env: &E) -> Term {
        match self {
            Term::Variable(name) => env.lookup(name).cloned().unwrap_or_else(|| self.clone()),
            Term::Constant(_) => self.clone(),
        }
    }
}

fn strip_quotes(token: &str) -> Option<&str> {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return Some(&token[1..token.len() - 1]);
        }
    }
    None
}

/// Constants that read back as the same constant when printed bare
fn is_bare_constant(text: &str) -> bool {
    if super::builtins::parse_number(text).is_some() {
        return true;
    }
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() && !c.is_uppercase() => {}
        Some('_') => {}
        _ => return false,
    }
    text != "not" && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "{}", name),
            Term::Constant(value) if is_bare_constant(value) => write!(f, "{}", value),
            Term::Constant(value) => {
                write!(f, "\"")?;
                for c in value.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
        }
    }
}

/// Infix comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `=` (binds an unbound side)
    Eq,
    /// `<>` (also written `!=`)
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Look up an operator by its source symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(CompareOp::Eq),
            "<>" | "!=" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            _ => None,
        }
    }

    /// Canonical symbol, used as the literal's predicate
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Prefix that marks a built-in function predicate
pub const FUNCTION_PREFIX: &str = "FN_";

/// Built-in arithmetic and relational functions, written `FN_<NAME>(...)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinFn {
    /// `FN_PLUS(A, B, C)`: C = A + B
    Plus,
    /// `FN_MINUS(A, B, C)`: C = A - B
    Minus,
    /// `FN_TIMES(A, B, C)`: C = A * B
    Times,
    /// `FN_DIV(A, B, C)`: C = A / B
    Div,
    /// `FN_MOD(A, B, C)`: C = A % B
    Mod,
    /// `FN_POW(A, B, C)`: C = A ^ B
    Pow,
    /// `FN_EXP(A, B)`: B = e ^ A
    Exp,
    /// `FN_SQRT(A, B)`
    Sqrt,
    /// `FN_LOG(A, B)`: natural logarithm
    Log,
    /// `FN_CEIL(A, B)`
    Ceil,
    /// `FN_FLOOR(A, B)`
    Floor,
    /// `FN_ROUND(A, B)`
    Round,
    /// `FN_ABS(A, B)`
    Abs,
    /// `FN_SAME(A, B)`, same as `A = B`
    Same,
    /// `FN_DISTINCT(A, B)`, same as `A <> B`
    Distinct,
    /// `FN_GT(A, B)`, same as `A > B`
    Gt,
    /// `FN_LT(A, B)`, same as `A < B`
    Lt,
    /// `FN_GEQ(A, B)`, same as `A >= B`
    Geq,
    /// `FN_LEQ(A, B)`, same as `A <= B`
    Leq,
}

impl BuiltinFn {
    /// All supported functions
    pub const ALL: [BuiltinFn; 19] = [
        BuiltinFn::Plus,
        BuiltinFn::Minus,
        BuiltinFn::Times,
        BuiltinFn::Div,
        BuiltinFn::Mod,
        BuiltinFn::Pow,
        BuiltinFn::Exp,
        BuiltinFn::Sqrt,
        BuiltinFn::Log,
        BuiltinFn::Ceil,
        BuiltinFn::Floor,
        BuiltinFn::Round,
        BuiltinFn::Abs,
        BuiltinFn::Same,
        BuiltinFn::Distinct,
        BuiltinFn::Gt,
        BuiltinFn::Lt,
        BuiltinFn::Geq,
        BuiltinFn::Leq,
    ];

    /// Resolve a predicate such as `FN_PLUS` (the name part is case-insensitive)
    pub fn from_predicate(predicate: &str) -> Option<Self> {
        let name = predicate.strip_prefix(FUNCTION_PREFIX)?;
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Function name without the prefix
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinFn::Plus => "PLUS",
            BuiltinFn::Minus => "MINUS",
            BuiltinFn::Times => "TIMES",
            BuiltinFn::Div => "DIV",
            BuiltinFn::Mod => "MOD",
            BuiltinFn::Pow => "POW",
            BuiltinFn::Exp => "EXP",
            BuiltinFn::Sqrt => "SQRT",
            BuiltinFn::Log => "LOG",
            BuiltinFn::Ceil => "CEIL",
            BuiltinFn::Floor => "FLOOR",
            BuiltinFn::Round => "ROUND",
            BuiltinFn::Abs => "ABS",
            BuiltinFn::Same => "SAME",
            BuiltinFn::Distinct => "DISTINCT",
            BuiltinFn::Gt => "GT",
            BuiltinFn::Lt => "LT",
            BuiltinFn::Geq => "GEQ",
            BuiltinFn::Leq => "LEQ",
        }
    }

    /// Number of operands the function takes
    pub fn arity(&self) -> usize {
        match self {
            BuiltinFn::Plus
            | BuiltinFn::Minus
            | BuiltinFn::Times
            | BuiltinFn::Div
            | BuiltinFn::Mod
            | BuiltinFn::Pow => 3,
            _ => 2,
        }
    }

    /// Whether the last operand is an output slot that may be bound
    pub fn binds_output(&self) -> bool {
        !matches!(
            self,
            BuiltinFn::Distinct | BuiltinFn::Gt | BuiltinFn::Lt | BuiltinFn::Geq | BuiltinFn::Leq
        )
    }
}

/// How a literal is evaluated, decided once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    /// Matched against facts
    Ordinary,
    /// Infix comparison
    Compare(CompareOp),
    /// `FN_` function
    Function(BuiltinFn),
}

impl LiteralKind {
    fn classify(predicate: &str) -> Self {
        if let Some(op) = CompareOp::from_symbol(predicate) {
            LiteralKind::Compare(op)
        } else if let Some(function) = BuiltinFn::from_predicate(predicate) {
            LiteralKind::Function(function)
        } else {
            LiteralKind::Ordinary
        }
    }

    /// Operand count a built-in requires, `None` for ordinary literals
    pub fn expected_arity(&self) -> Option<usize> {
        match self {
            LiteralKind::Ordinary => None,
            LiteralKind::Compare(_) => Some(2),
            LiteralKind::Function(function) => Some(function.arity()),
        }
    }
}

/// A Datalog literal: a predicate applied to terms, possibly negated
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    predicate: Arc<str>,
    terms: Vec<Term>,
    negated: bool,
    kind: LiteralKind,
}

impl Literal {
    /// Create a new literal. `!=` is normalised to `<>`.
    pub fn new(predicate: impl AsRef<str>, terms: Vec<Term>) -> Self {
        let predicate = match predicate.as_ref() {
            "!=" => "<>",
            other => other,
        };
        Literal {
            kind: LiteralKind::classify(predicate),
            predicate: Arc::from(predicate),
            terms,
            negated: false,
        }
    }

    /// Create a negated literal
    pub fn negated(predicate: impl AsRef<str>, terms: Vec<Term>) -> Self {
        Literal::new(predicate, terms).negate()
    }

    /// Create a literal from source tokens, classifying each with [`Term::parse`]
    ///
    /// ```
    /// use strata_core::datalog::Literal;
    /// let goal = Literal::from_tokens("parent", ["alice", "X"]);
    /// assert_eq!(goal.to_string(), "parent(alice, X)");
    /// ```
    pub fn from_tokens<I, S>(predicate: impl AsRef<str>, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = tokens.into_iter().map(|t| Term::parse(t.as_ref())).collect();
        Literal::new(predicate, terms)
    }

    /// Infix comparison `left op right`
    pub fn compare(op: CompareOp, left: Term, right: Term) -> Self {
        Literal::new(op.symbol(), vec![left, right])
    }

    /// Return this literal with the negation flag set
    pub fn negate(mut self) -> Self {
        self.negated = true;
        self
    }

    /// Predicate name
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// Shared predicate name, for index keys
    pub fn predicate_arc(&self) -> &Arc<str> {
        &self.predicate
    }

    /// Terms (arguments)
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Whether this is `not ...`
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Evaluation kind
    pub fn kind(&self) -> LiteralKind {
        self.kind
    }

    /// Built-ins are evaluated, not matched against facts
    pub fn is_builtin(&self) -> bool {
        self.kind != LiteralKind::Ordinary
    }

    /// Get the arity (number of terms)
    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    /// Check if literal is ground (no variables)
    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(Term::is_constant)
    }

    /// Variables in order of appearance (may repeat)
    pub fn variables(&self) -> impl Iterator<Item = &Arc<str>> {
        self.terms.iter().filter_map(|t| match t {
            Term::Variable(name) => Some(name),
            Term::Constant(_) => None,
        })
    }

    /// Apply bindings to get a new literal; unbound variables stay in place
    pub fn substitute<E: BindingEnv + ?Sized>(&self, env: &E) -> Literal {
        Literal {
            predicate: self.predicate.clone(),
            terms: self.terms.iter().map(|t| t.substitute(env)).collect(),
            negated: self.negated,
            kind: self.kind,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not ")?;
        }
        if let (LiteralKind::Compare(op), [left, right]) = (self.kind, self.terms.as_slice()) {
            return write!(f, "{} {} {}", left, op, right);
        }
        write!(f, "{}(", self.predicate)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", term)?;
        }
        write!(f, ")")
    }
}

/// Where a goal falls in a canonical body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GoalClass {
    /// Positive ordinary literal
    Source,
    /// Positive built-in that can bind a variable
    Binder,
    /// Negated literal or built-in that only tests
    Filter,
}

fn classify(literal: &Literal) -> GoalClass {
    if literal.is_negated() {
        return GoalClass::Filter;
    }
    match literal.kind() {
        LiteralKind::Ordinary => GoalClass::Source,
        LiteralKind::Compare(CompareOp::Eq) => GoalClass::Binder,
        LiteralKind::Function(function) if function.binds_output() => GoalClass::Binder,
        LiteralKind::Compare(_) | LiteralKind::Function(_) => GoalClass::Filter,
    }
}

/// Whether `literal` can run once the variables in `bound` have values
fn is_ready(literal: &Literal, class: GoalClass, bound: &HashSet<Arc<str>>) -> bool {
    let is_bound = |term: &Term| term.as_variable().map_or(true, |v| bound.contains(v));
    match (class, literal.kind()) {
        (GoalClass::Source, _) => true,
        (GoalClass::Binder, LiteralKind::Compare(_) | LiteralKind::Function(BuiltinFn::Same)) => {
            literal.terms().iter().any(is_bound)
        }
        (GoalClass::Binder, _) => literal
            .terms()
            .split_last()
            .map_or(true, |(_, inputs)| inputs.iter().all(is_bound)),
        (GoalClass::Filter, _) => literal.terms().iter().all(is_bound),
    }
}

/// Put goals into canonical order
///
/// Positive ordinary literals come first, in their original order. Binding
/// built-ins (`=`, `FN_SAME`, functions with an output) follow, each as soon
/// as its inputs are bound. Negated literals and test-only built-ins come
/// last, once all their variables are bound. Goals that never become ready
/// keep their original order at the end, where validation reports them.
///
/// `a(X) :- not b(X), c(X)` can only be evaluated once `c(X)` has bound `X`,
/// and in `n(X), FN_PLUS(X, 1, Y), Z = Y` the equality stays after the
/// function that binds `Y`.
pub fn reorder_goals(goals: Vec<Literal>) -> Vec<Literal> {
    let mut pending: Vec<(GoalClass, Literal)> = goals.into_iter().map(|g| (classify(&g), g)).collect();
    let mut ordered = Vec::with_capacity(pending.len());
    let mut bound: HashSet<Arc<str>> = HashSet::new();

    loop {
        let next = [GoalClass::Source, GoalClass::Binder, GoalClass::Filter]
            .into_iter()
            .find_map(|wanted| {
                pending
                    .iter()
                    .position(|(class, goal)| *class == wanted && is_ready(goal, *class, &bound))
            });
        let Some(index) = next else { break };

        let (class, goal) = pending.remove(index);
        if class != GoalClass::Filter {
            bound.extend(goal.variables().cloned());
        }
        ordered.push(goal);
    }

    ordered.extend(pending.into_iter().map(|(_, goal)| goal));
    ordered
}

/// A Datalog rule (Horn clause): head :- body
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    head: Literal,
    body: Vec<Literal>,
}

impl Rule {
    /// Create a new rule. The body is stored in canonical order (see [`reorder_goals`]).
    pub fn new(head: Literal, body: Vec<Literal>) -> Self {
        Rule {
            head,
            body: reorder_goals(body),
        }
    }

    /// Head of the rule (consequent)
    pub fn head(&self) -> &Literal {
        &self.head
    }

    /// Body of the rule in canonical order
    pub fn body(&self) -> &[Literal] {
        &self.body
    }

    /// Check if this is a recursive rule
    pub fn is_recursive(&self) -> bool {
        self.body
            .iter()
            .any(|literal| literal.predicate() == self.head.predicate())
    }

    /// Predicates this rule's body mentions (built-ins excluded)
    pub fn dependencies(&self) -> BTreeSet<&str> {
        self.body
            .iter()
            .filter(|literal| !literal.is_builtin())
            .map(Literal::predicate)
            .collect()
    }

    /// Substitute bindings into head and body
    pub fn substitute<E: BindingEnv + ?Sized>(&self, env: &E) -> Rule {
        Rule::new(
            self.head.substitute(env),
            self.body.iter().map(|l| l.substitute(env)).collect(),
        )
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :- ", self.head)?;
        for (i, literal) in self.body.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", literal)?;
        }
        write!(f, ".")
    }
}
