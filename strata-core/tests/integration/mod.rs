//! Shared helpers for the integration tests

use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use strata_core::{parse_goals, Bindings, Engine};

/// Engine loaded with `source`
pub fn engine_with(source: &str) -> Engine {
    let mut engine = Engine::new();
    engine.execute(source).expect("program should load");
    engine
}

/// Answer `goals` (written in source syntax)
pub fn ask(engine: &Engine, goals: &str) -> Vec<Bindings> {
    engine
        .query(&parse_goals(goals).expect("goals should parse"), None)
        .expect("query should succeed")
}

/// Values bound to `var` across all answers, sorted
pub fn values(answers: &[Bindings], var: &str) -> BTreeSet<String> {
    answers
        .iter()
        .filter_map(|answer| answer.get_text(var))
        .map(str::to_string)
        .collect()
}

/// Owned set of expected values
pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Helper to measure operation performance
pub fn measure_performance<F, R>(operation: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let result = operation();
    (result, start.elapsed())
}
