//! Engine configuration

use crate::datalog::ComparisonMode;
use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration
///
/// Loadable from TOML; missing keys fall back to their defaults:
///
/// ```toml
/// comparison_mode = "strict"
/// relevance_filtering = true
/// constant_index = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// How `<`, `<=`, `>` and `>=` treat non-numeric operands
    pub comparison_mode: ComparisonMode,
    /// Only evaluate rules and facts reachable from the query's predicates
    pub relevance_filtering: bool,
    /// Maintain the (predicate, position, constant) index on fact sets
    pub constant_index: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            comparison_mode: ComparisonMode::Permissive,
            relevance_filtering: true,
            constant_index: true,
        }
    }
}

impl EngineConfig {
    /// Strict comparisons, all optimisations on
    pub fn strict() -> Self {
        EngineConfig {
            comparison_mode: ComparisonMode::Strict,
            ..Self::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| StrataError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| StrataError::Config(e.to_string()))
    }
}
