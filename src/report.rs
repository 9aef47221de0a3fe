//! Serializable reduction report
//!
//! The report is the external face of a reduction run: the selected test
//! cases with their assignments and covered branches, the extracted branch
//! list, and the headline numbers. Serialization goes through serde_json;
//! the field names are the stable wire contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::condition::{Branch, Value};
use crate::errors::CovminResult;
use crate::generate::TestCase;
use crate::matrix::FeasibilityReport;
use crate::reduce::{Algorithm, ReductionResult};

/// One selected test case as reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedTestCase {
    pub name: String,
    pub values: BTreeMap<String, Value>,
    pub covered_branches: Vec<String>,
}

/// Complete outcome of one reduction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionReport {
    /// Label for the analyzed source, typically its file path
    pub source: String,
    pub algorithm: Algorithm,
    pub original_test_count: usize,
    pub reduced_test_count: usize,
    pub coverage_percentage: f64,
    /// Tests eliminated as a percentage of the original universe
    pub reduction_percentage: f64,
    pub execution_time_secs: f64,
    /// Branch ids that no candidate test case could satisfy
    pub infeasible_branches: Vec<String>,
    pub test_cases: Vec<ReportedTestCase>,
    pub branches: Vec<Branch>,
}

impl ReductionReport {
    /// Assemble a report from a solver result and the universe it ran over
    pub fn new(
        source: impl Into<String>,
        result: &ReductionResult,
        universe: &[TestCase],
        branches: &[Branch],
        feasibility: &FeasibilityReport,
    ) -> Self {
        let test_cases = result
            .selected
            .iter()
            .filter_map(|&index| universe.get(index))
            .map(|test| ReportedTestCase {
                name: test.name.clone(),
                values: test.values.clone(),
                covered_branches: test.covered.iter().cloned().collect(),
            })
            .collect::<Vec<_>>();
        let reduction_percentage = if universe.is_empty() {
            0.0
        } else {
            (1.0 - result.selected.len() as f64 / universe.len() as f64) * 100.0
        };
        Self {
            source: source.into(),
            algorithm: result.algorithm,
            original_test_count: universe.len(),
            reduced_test_count: test_cases.len(),
            coverage_percentage: result.coverage_percentage,
            reduction_percentage,
            execution_time_secs: result.elapsed.as_secs_f64(),
            infeasible_branches: feasibility.infeasible_branches.clone(),
            test_cases,
            branches: branches.to_vec(),
        }
    }

    pub fn to_json(&self) -> CovminResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> CovminResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
