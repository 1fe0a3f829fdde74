//! Metrics for query evaluation
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! embedding application installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Queries answered, labelled by outcome
pub const QUERIES_TOTAL: &str = "strata_queries_total";
/// Facts added by rule evaluation
pub const FACTS_DERIVED_TOTAL: &str = "strata_facts_derived_total";
/// End-to-end query latency
pub const QUERY_LATENCY_SECONDS: &str = "strata_query_latency_seconds";
/// Queries aborted by an evaluation fault
pub const EVALUATION_FAULTS_TOTAL: &str = "strata_evaluation_faults_total";

/// Initialize all metric descriptions
pub fn register_metrics() {
    describe_counter!(QUERIES_TOTAL, "Total number of queries evaluated");
    describe_counter!(FACTS_DERIVED_TOTAL, "Total number of facts derived by rules");
    describe_counter!(EVALUATION_FAULTS_TOTAL, "Total number of queries aborted by an evaluation fault");
    describe_histogram!(QUERY_LATENCY_SECONDS, "Query latency in seconds");
}

/// Record a finished query
pub fn record_query(latency: Duration, answered: bool) {
    let outcome = if answered { "ok" } else { "error" };
    counter!(QUERIES_TOTAL, 1, "outcome" => outcome);
    histogram!(QUERY_LATENCY_SECONDS, latency.as_secs_f64());
}

/// Record facts derived while answering a query
pub fn record_derived(count: usize) {
    if count > 0 {
        counter!(FACTS_DERIVED_TOTAL, count as u64);
    }
}

/// Record a query aborted by a fault
pub fn record_fault(kind: &'static str) {
    counter!(EVALUATION_FAULTS_TOTAL, 1, "kind" => kind);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        register_metrics();
        record_query(Duration::from_millis(3), true);
        record_derived(0);
        record_derived(12);
        record_fault("evaluation");
    }
}
