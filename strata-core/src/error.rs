//! Error types for Strata

use thiserror::Error;

/// Main error type for Strata operations
#[derive(Error, Debug)]
pub enum StrataError {
    /// Parse error in Datalog source text
    #[error("[line {line}] Parse error: {message}")]
    Parse {
        /// 1-based source line
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Rule or fact rejected at insertion time
    #[error("Validation error: {0}")]
    Validation(String),

    /// Negative recursion through the rule set
    #[error("Stratification error: {0}")]
    Stratification(String),

    /// Fault raised while evaluating a query
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A statement from a program failed while executing
    #[error("[line {line}] Error executing statement: {source}")]
    Statement {
        /// 1-based source line of the statement
        line: usize,
        /// The underlying failure
        #[source]
        source: Box<StrataError>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StrataError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            StrataError::Parse { .. } => "parse",
            StrataError::Validation(_) => "validation",
            StrataError::Stratification(_) => "stratification",
            StrataError::Evaluation(_) => "evaluation",
            StrataError::Statement { source, .. } => source.kind(),
            StrataError::Config(_) => "config",
            StrataError::Io(_) => "io",
            StrataError::Serialization(_) => "serialization",
        }
    }
}

/// Result type alias for Strata operations
pub type Result<T> = std::result::Result<T, StrataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_error_keeps_line_and_kind() {
        let err = StrataError::Statement {
            line: 7,
            source: Box::new(StrataError::Validation("Fact p(X) is not ground".into())),
        };

        assert_eq!(err.kind(), "validation");
        let message = err.to_string();
        assert!(message.starts_with("[line 7]"));
        assert!(message.contains("not ground"));
    }
}
