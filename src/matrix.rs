//! Condition evaluation and coverage-matrix construction
//!
//! A branch is satisfied by a test case iff every condition in its sequence
//! evaluates true under the test's values. Evaluation fails closed: a
//! missing variable, an uncoercible literal, or an operator/type pairing
//! that cannot be evaluated makes the condition unsatisfied, never an error
//! to the caller. Matrix construction is polynomial in tests × branches.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::condition::{Branch, Condition, Value};
use crate::generate::TestCase;

/// Boolean relation between candidate test cases and the branches they
/// satisfy, index-aligned with the tests and branches it was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageMatrix {
    test_names: Vec<String>,
    branch_ids: Vec<String>,
    rows: Vec<Vec<bool>>,
}

impl CoverageMatrix {
    /// Build a matrix from pre-computed rows
    ///
    /// Row count must match `test_names` and every row's width must match
    /// `branch_ids`; violating that is a construction bug.
    pub fn new(test_names: Vec<String>, branch_ids: Vec<String>, rows: Vec<Vec<bool>>) -> Self {
        assert_eq!(test_names.len(), rows.len(), "one row per test case");
        for row in &rows {
            assert_eq!(branch_ids.len(), row.len(), "one column per branch");
        }
        Self {
            test_names,
            branch_ids,
            rows,
        }
    }

    /// Build a matrix by evaluating a predicate for every (test, branch)
    /// index pair
    pub fn from_fn(
        test_names: Vec<String>,
        branch_ids: Vec<String>,
        mut satisfied: impl FnMut(usize, usize) -> bool,
    ) -> Self {
        let rows = (0..test_names.len())
            .map(|t| (0..branch_ids.len()).map(|b| satisfied(t, b)).collect())
            .collect();
        Self {
            test_names,
            branch_ids,
            rows,
        }
    }

    pub fn num_tests(&self) -> usize {
        self.rows.len()
    }

    pub fn num_branches(&self) -> usize {
        self.branch_ids.len()
    }

    pub fn is_covered(&self, test: usize, branch: usize) -> bool {
        self.rows[test][branch]
    }

    pub fn row(&self, test: usize) -> &[bool] {
        &self.rows[test]
    }

    pub fn test_names(&self) -> &[String] {
        &self.test_names
    }

    pub fn branch_ids(&self) -> &[String] {
        &self.branch_ids
    }
}

/// Per-branch feasibility under the generated domains
///
/// An infeasible branch has no covering row at all; it is reported as a
/// diagnostic so a caller can tell "this branch is unreachable under the
/// current domains" apart from "the solver failed to find a full cover".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeasibilityReport {
    /// Branch ids with zero covering test cases, in branch order
    pub infeasible_branches: Vec<String>,
    pub total_branches: usize,
}

impl FeasibilityReport {
    pub fn is_fully_feasible(&self) -> bool {
        self.infeasible_branches.is_empty()
    }

    pub fn feasible_count(&self) -> usize {
        self.total_branches - self.infeasible_branches.len()
    }
}

/// Evaluate every test case against every branch
pub fn build_matrix(tests: &[TestCase], branches: &[Branch]) -> (CoverageMatrix, FeasibilityReport) {
    let test_names = tests.iter().map(|t| t.name.clone()).collect();
    let branch_ids: Vec<String> = branches.iter().map(|b| b.id.clone()).collect();
    let rows: Vec<Vec<bool>> = tests
        .iter()
        .map(|test| {
            branches
                .iter()
                .map(|branch| branch_satisfied(branch, &test.values))
                .collect()
        })
        .collect();

    let infeasible_branches: Vec<String> = branch_ids
        .iter()
        .enumerate()
        .filter(|(b, _)| !rows.iter().any(|row| row[*b]))
        .map(|(_, id)| id.clone())
        .collect();
    if !infeasible_branches.is_empty() {
        debug!(
            infeasible = ?infeasible_branches,
            "branches with no covering test case under current domains"
        );
    }
    let report = FeasibilityReport {
        infeasible_branches,
        total_branches: branch_ids.len(),
    };
    (CoverageMatrix::new(test_names, branch_ids, rows), report)
}

/// Ids of the branches whose whole condition sequence holds under `values`
pub fn covered_branches(
    values: &BTreeMap<String, Value>,
    branches: &[Branch],
) -> BTreeSet<String> {
    branches
        .iter()
        .filter(|branch| branch_satisfied(branch, values))
        .map(|branch| branch.id.clone())
        .collect()
}

/// A branch is satisfied iff every condition of its conjunction is
pub fn branch_satisfied(branch: &Branch, values: &BTreeMap<String, Value>) -> bool {
    branch
        .conditions
        .iter()
        .all(|condition| condition_satisfied(condition, values))
}

/// Evaluate one condition against a test assignment, failing closed
pub fn condition_satisfied(condition: &Condition, values: &BTreeMap<String, Value>) -> bool {
    match condition {
        Condition::BooleanTest { variable, negated } => match values.get(variable) {
            Some(Value::Bool(b)) => *b != *negated,
            // Missing variable or non-boolean value under a boolean test.
            _ => false,
        },
        Condition::Comparison {
            variable,
            op,
            literal,
        } => {
            let Some(actual) = values.get(variable) else {
                return false;
            };
            match compare_to_literal(actual, literal) {
                Some(ordering) => op.matches(ordering),
                None => false,
            }
        }
    }
}

/// Coerce the literal into the actual value's semantic type and compare
fn compare_to_literal(actual: &Value, literal: &str) -> Option<Ordering> {
    let literal = literal.trim();
    match actual {
        Value::Bool(b) => coerce_bool(literal).map(|expected| b.cmp(&expected)),
        Value::Int(i) => {
            if let Ok(expected) = literal.parse::<i64>() {
                Some(i.cmp(&expected))
            } else if let Ok(expected) = literal.parse::<f64>() {
                Some((*i as f64).total_cmp(&expected))
            } else {
                None
            }
        }
        Value::Float(f) => literal.parse::<f64>().ok().map(|expected| f.total_cmp(&expected)),
        Value::Text(t) => {
            let expected = literal.trim_matches(|c| c == '"' || c == '\'');
            Some(t.as_str().cmp(expected))
        }
    }
}

fn coerce_bool(literal: &str) -> Option<bool> {
    match literal.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
