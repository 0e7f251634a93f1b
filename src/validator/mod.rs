//! The test validator boundary: runs an assembled test source against the
//! target package and reports an outcome (spec.md §6).

mod node;

pub use node::NodeProcessValidator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collector::TestOutcome;

/// A coverage summary, carried verbatim from whatever the validator's
/// coverage tool emits. `None` fields mean the validator did not produce
/// that figure for this run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoverageSummary {
    pub lines_pct: Option<f64>,
    pub functions_pct: Option<f64>,
    pub branches_pct: Option<f64>,
    pub statements_pct: Option<f64>,
}

/// Runs a named test source and classifies the result.
#[async_trait]
pub trait TestValidator: Send + Sync {
    async fn validate(&self, name: &str, source: &str) -> TestOutcome;
    fn coverage_summary(&self) -> CoverageSummary;
    async fn cleanup(&self);
}
