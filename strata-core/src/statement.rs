//! Parsed statements that run against an [`Engine`]
//!
//! A statement can be parsed once and executed many times with different
//! bindings, like a prepared statement:
//!
//! ```
//! use strata_core::{parse_statement, Bindings, Engine};
//!
//! let mut engine = Engine::new();
//! let insert = parse_statement("person(Name).").unwrap();
//! for name in ["alice", "bob"] {
//!     let bindings = Bindings::from_pairs([("Name", name)]);
//!     insert.execute(&mut engine, Some(&bindings)).unwrap();
//! }
//! assert_eq!(engine.facts().len(), 2);
//! ```

use crate::datalog::{Bindings, Literal, Rule};
use crate::engine::Engine;
use crate::error::Result;
use std::fmt;

/// One executable unit of a Datalog program
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `fact.`
    InsertFact(Literal),
    /// `head :- body.`
    InsertRule(Rule),
    /// `goals?`
    Query(Vec<Literal>),
    /// `goals~`
    Delete(Vec<Literal>),
}

impl Statement {
    /// Run against `engine`. Only queries return answers.
    ///
    /// `bindings` are substituted into facts and rules before insertion, and
    /// seed queries and deletions.
    pub fn execute(&self, engine: &mut Engine, bindings: Option<&Bindings>) -> Result<Option<Vec<Bindings>>> {
        match self {
            Statement::InsertFact(fact) => {
                let fact = match bindings {
                    Some(b) => fact.substitute(b),
                    None => fact.clone(),
                };
                engine.fact(fact)?;
                Ok(None)
            }
            Statement::InsertRule(rule) => {
                let rule = match bindings {
                    Some(b) => rule.substitute(b),
                    None => rule.clone(),
                };
                engine.rule(rule)?;
                Ok(None)
            }
            Statement::Query(goals) => engine.query(goals, bindings).map(Some),
            Statement::Delete(goals) => {
                engine.delete(goals, bindings)?;
                Ok(None)
            }
        }
    }

    /// Whether this statement produces answers
    pub fn is_query(&self) -> bool {
        matches!(self, Statement::Query(_))
    }
}

fn write_goals(f: &mut fmt::Formatter<'_>, goals: &[Literal]) -> fmt::Result {
    for (i, goal) in goals.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", goal)?;
    }
    Ok(())
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::InsertFact(fact) => write!(f, "{}.", fact),
            Statement::InsertRule(rule) => write!(f, "{}", rule),
            Statement::Query(goals) => {
                write_goals(f, goals)?;
                write!(f, "?")
            }
            Statement::Delete(goals) => {
                write_goals(f, goals)?;
                write!(f, "~")
            }
        }
    }
}
