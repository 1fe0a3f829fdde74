//! Strata Core - an embeddable Datalog engine
//!
//! This crate stores ground facts and rules, derives everything they entail
//! with stratified semi-naive evaluation, and answers pattern-matching queries
//! with negation, comparisons and arithmetic built-ins.
//!
//! ```
//! use strata_core::{parse_goals, Bindings, Engine};
//!
//! let mut engine = Engine::new();
//! engine
//!     .execute(
//!         "parent(alice, bob). parent(bob, carol).
//!          ancestor(X, Y) :- parent(X, Y).
//!          ancestor(X, Y) :- ancestor(X, Z), parent(Z, Y).",
//!     )
//!     .unwrap();
//!
//! let answers = engine.query(&parse_goals("ancestor(alice, Y)").unwrap(), None).unwrap();
//! assert_eq!(answers.len(), 2);
//! assert!(answers.contains(&Bindings::from_pairs([("Y", "carol")])));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod datalog;
pub mod engine;
pub mod error;
pub mod logging;
pub mod monitoring;
pub mod output;
pub mod parser;
pub mod statement;

pub use config::EngineConfig;
pub use datalog::{Bindings, ComparisonMode, EvaluationStats, FactProvider, FactSet, Literal, MemoryProvider, Rule, Term};
pub use engine::{Engine, QueryOutcome, SharedEngine};
pub use error::{Result, StrataError};
pub use logging::{init_tracing, LoggingConfig};
pub use output::{render_answers, render_answers_json};
pub use parser::{parse_goals, parse_program, parse_statement, ParsedStatement};
pub use statement::Statement;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
