//! Variable-domain inference and test-case generation
//!
//! Every variable gets a finite candidate-value set: `{true, false}` by
//! default, widened by the literals its conditions compare against, with
//! boundary values around numeric literals so ordering comparisons can fall
//! on either side. The candidate universe is the Cartesian product of all
//! domains, enumerated in sorted variable-name order — a published contract
//! so repeated runs produce identical, deterministically named test cases.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::condition::{Branch, Condition, Value};
use crate::matrix;

/// One candidate test case: an assignment of a value to every variable,
/// plus the branches that assignment satisfies
///
/// The covered-branch set is computed once at generation time and is not
/// updated afterward; test cases live only for the duration of one
/// reduction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Deterministic name: concatenated `var=value` pairs in sorted order
    pub name: String,
    pub values: BTreeMap<String, Value>,
    /// Ids of the branches whose full condition sequence this assignment
    /// satisfies
    pub covered: BTreeSet<String>,
}

/// Infer a candidate-value domain for every variable
///
/// Comparison literals widen the default boolean domain to their union; a
/// domain that ends up as a single boolean is widened back to both booleans
/// so a simple boolean test keeps both of its branches reachable. Numeric
/// domains gain one value below their minimum and one above their maximum.
pub fn infer_domains(
    branches: &[Branch],
    variables: &BTreeSet<String>,
) -> BTreeMap<String, Vec<Value>> {
    let mut domains = BTreeMap::new();
    for variable in variables {
        let mut values: Vec<Value> = Vec::new();
        for branch in branches {
            for condition in &branch.conditions {
                if condition.variable() != variable {
                    continue;
                }
                match condition {
                    Condition::Comparison { literal, .. } => {
                        push_unique(&mut values, Value::parse_literal(literal));
                    }
                    Condition::BooleanTest { .. } => {
                        push_unique(&mut values, Value::Bool(true));
                        push_unique(&mut values, Value::Bool(false));
                    }
                }
            }
        }

        if values.is_empty() {
            values = vec![Value::Bool(true), Value::Bool(false)];
        } else if values.len() == 1 && matches!(values[0], Value::Bool(_)) {
            // A single boolean literal would make one side of the test
            // unreachable.
            push_unique(&mut values, Value::Bool(true));
            push_unique(&mut values, Value::Bool(false));
        }

        augment_numeric_boundaries(&mut values);
        values.sort_by(|a, b| a.total_order(b));
        domains.insert(variable.clone(), values);
    }
    domains
}

fn push_unique(values: &mut Vec<Value>, value: Value) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Add one value below the numeric minimum and one above the maximum
fn augment_numeric_boundaries(values: &mut Vec<Value>) {
    let numeric: Vec<Value> = values.iter().filter(|v| v.is_numeric()).cloned().collect();
    if numeric.is_empty() {
        return;
    }
    let mut min = numeric[0].clone();
    let mut max = numeric[0].clone();
    for value in &numeric[1..] {
        if value.total_order(&min).is_lt() {
            min = value.clone();
        }
        if value.total_order(&max).is_gt() {
            max = value.clone();
        }
    }
    let below = match min {
        Value::Int(i) => Value::Int(i - 1),
        Value::Float(f) => Value::Float(f - 1.0),
        _ => return,
    };
    let above = match max {
        Value::Int(i) => Value::Int(i + 1),
        Value::Float(f) => Value::Float(f + 1.0),
        _ => return,
    };
    push_unique(values, below);
    push_unique(values, above);
}

/// Generate the full candidate test-case universe
///
/// `overrides` maps variable names to explicit candidate lists; variables
/// without an override use the inferred domain. The universe is the
/// Cartesian product across all variables, iterated in sorted-name order,
/// and each test case's covered-branch set is evaluated against `branches`
/// once, here.
pub fn generate_test_cases(
    branches: &[Branch],
    variables: &BTreeSet<String>,
    overrides: Option<&BTreeMap<String, Vec<Value>>>,
) -> Vec<TestCase> {
    let mut domains = infer_domains(branches, variables);
    if let Some(overrides) = overrides {
        for (variable, values) in overrides {
            domains.insert(variable.clone(), values.clone());
        }
    }

    let names: Vec<&String> = domains.keys().collect();
    let candidate_lists: Vec<&Vec<Value>> = domains.values().collect();
    if candidate_lists.iter().any(|list| list.is_empty()) {
        debug!("a variable has an empty candidate domain; universe is empty");
        return Vec::new();
    }

    let mut test_cases = Vec::new();
    // Odometer over the candidate lists; rightmost digit spins fastest so
    // the universe follows lexicographic order over sorted variable names.
    let mut odometer = vec![0usize; candidate_lists.len()];
    loop {
        let mut values = BTreeMap::new();
        for (slot, &digit) in odometer.iter().enumerate() {
            values.insert(names[slot].clone(), candidate_lists[slot][digit].clone());
        }
        let name = values
            .iter()
            .map(|(var, value)| format!("{var}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        let covered = matrix::covered_branches(&values, branches);
        test_cases.push(TestCase {
            name,
            values,
            covered,
        });

        let mut slot = odometer.len();
        loop {
            if slot == 0 {
                debug!(count = test_cases.len(), "generated candidate universe");
                return test_cases;
            }
            slot -= 1;
            odometer[slot] += 1;
            if odometer[slot] < candidate_lists[slot].len() {
                break;
            }
            odometer[slot] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::CompareOp;
    use pretty_assertions::assert_eq;

    fn vars(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_domain_is_boolean() {
        let branches = vec![Branch::new("if_0", vec![Condition::boolean_test("a")])];
        let domains = infer_domains(&branches, &vars(&["a", "b"]));
        assert_eq!(
            domains["a"],
            vec![Value::Bool(false), Value::Bool(true)]
        );
        assert_eq!(
            domains["b"],
            vec![Value::Bool(false), Value::Bool(true)]
        );
    }

    #[test]
    fn test_single_boolean_literal_widens_to_both() {
        let branches = vec![Branch::new(
            "if_0",
            vec![Condition::comparison("flag", CompareOp::Eq, "true")],
        )];
        let domains = infer_domains(&branches, &vars(&["flag"]));
        assert_eq!(
            domains["flag"],
            vec![Value::Bool(false), Value::Bool(true)]
        );
    }

    #[test]
    fn test_numeric_domain_gains_boundaries() {
        let branches = vec![
            Branch::new("if_0", vec![Condition::comparison("x", CompareOp::Gt, "5")]),
            Branch::new("if_1", vec![Condition::comparison("x", CompareOp::Le, "10")]),
        ];
        let domains = infer_domains(&branches, &vars(&["x"]));
        assert_eq!(
            domains["x"],
            vec![Value::Int(4), Value::Int(5), Value::Int(10), Value::Int(11)]
        );
    }

    #[test]
    fn test_text_literals_collected_without_boundaries() {
        let branches = vec![
            Branch::new(
                "if_0",
                vec![Condition::comparison("role", CompareOp::Eq, "admin")],
            ),
            Branch::new(
                "if_1",
                vec![Condition::comparison("role", CompareOp::Eq, "guest")],
            ),
        ];
        let domains = infer_domains(&branches, &vars(&["role"]));
        assert_eq!(
            domains["role"],
            vec![Value::Text("admin".into()), Value::Text("guest".into())]
        );
    }

    #[test]
    fn test_universe_is_cartesian_product_in_sorted_order() {
        let branches = vec![Branch::new(
            "if_0",
            vec![Condition::boolean_test("b"), Condition::boolean_test("a")],
        )];
        let tests = generate_test_cases(&branches, &vars(&["b", "a"]), None);
        assert_eq!(tests.len(), 4);
        // `a` sorts first, so it is the slow digit.
        assert_eq!(tests[0].name, "a=false,b=false");
        assert_eq!(tests[1].name, "a=false,b=true");
        assert_eq!(tests[2].name, "a=true,b=false");
        assert_eq!(tests[3].name, "a=true,b=true");
    }

    #[test]
    fn test_covered_branches_filled_at_generation() {
        let branches = vec![
            Branch::new("if_0", vec![Condition::boolean_test("a")]),
            Branch::new("else_1", vec![Condition::boolean_test("a").negated()]),
        ];
        let tests = generate_test_cases(&branches, &vars(&["a"]), None);
        assert_eq!(tests.len(), 2);
        assert!(tests[0].covered.contains("else_1"));
        assert!(tests[1].covered.contains("if_0"));
    }

    #[test]
    fn test_domain_overrides_replace_inferred() {
        let branches = vec![Branch::new(
            "if_0",
            vec![Condition::comparison("x", CompareOp::Gt, "5")],
        )];
        let mut overrides = BTreeMap::new();
        overrides.insert("x".to_string(), vec![Value::Int(0), Value::Int(100)]);
        let tests = generate_test_cases(&branches, &vars(&["x"]), Some(&overrides));
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].values["x"], Value::Int(0));
        assert_eq!(tests[1].values["x"], Value::Int(100));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let branches = vec![
            Branch::new("if_0", vec![Condition::comparison("x", CompareOp::Gt, "3")]),
            Branch::new("if_1", vec![Condition::boolean_test("flag")]),
        ];
        let variables = vars(&["x", "flag"]);
        let first = generate_test_cases(&branches, &variables, None);
        let second = generate_test_cases(&branches, &variables, None);
        assert_eq!(first, second);
    }
}
