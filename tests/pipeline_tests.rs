//! End-to-end pipeline tests: source text in, reduced test set out

use std::collections::BTreeMap;

use covmin::{
    best_of_all, build_matrix, compare_all, extract, generate_test_cases, Algorithm,
    CovminError, ReductionReport, Value,
};
use pretty_assertions::assert_eq;

const THREE_PREDICATES: &str = r#"
    if ((a || b) && c) { one(); }
    if (a && b) { two(); }
    if (a && !c) { three(); }
"#;

#[test]
fn test_three_predicate_universe_has_eight_cases() {
    let extraction = extract(THREE_PREDICATES).unwrap();
    assert_eq!(extraction.branches.len(), 3);
    assert_eq!(extraction.variables.len(), 3);

    let universe = generate_test_cases(&extraction.branches, &extraction.variables, None);
    assert_eq!(universe.len(), 8);
}

#[test]
fn test_three_predicate_minimum_cover_is_two() {
    let extraction = extract(THREE_PREDICATES).unwrap();
    let universe = generate_test_cases(&extraction.branches, &extraction.variables, None);
    let (matrix, feasibility) = build_matrix(&universe, &extraction.branches);
    assert!(feasibility.is_fully_feasible());

    // The second and third predicates need `c` on opposite sides, so no
    // single assignment covers all three branches.
    let results = compare_all(&matrix);
    let optimal = results
        .iter()
        .find(|r| r.algorithm == Algorithm::Optimal)
        .expect("eight candidates is within the exhaustive limit");
    assert_eq!(optimal.selected.len(), 2);
    assert_eq!(optimal.coverage_percentage, 100.0);

    for result in &results {
        assert_eq!(result.coverage_percentage, 100.0, "{}", result.algorithm);
        assert!(result.selected.len() >= 2, "{}", result.algorithm);
    }
}

#[test]
fn test_chain_branches_are_mutually_exclusive() {
    let source = r#"
        if (x > 10) { a(); }
        else if (x > 5) { b(); }
        else { c(); }
    "#;
    let extraction = extract(source).unwrap();
    let universe = generate_test_cases(&extraction.branches, &extraction.variables, None);
    let (matrix, feasibility) = build_matrix(&universe, &extraction.branches);
    assert!(feasibility.is_fully_feasible());

    // Sibling negations make every assignment satisfy at most one branch of
    // the chain.
    for test in 0..matrix.num_tests() {
        let hits = matrix.row(test).iter().filter(|&&hit| hit).count();
        assert!(hits <= 1, "test {test} satisfies {hits} chain branches");
    }
}

#[test]
fn test_full_cover_touches_every_branch() {
    let extraction = extract(THREE_PREDICATES).unwrap();
    let universe = generate_test_cases(&extraction.branches, &extraction.variables, None);
    let (matrix, _) = build_matrix(&universe, &extraction.branches);

    let winner = best_of_all(&matrix).unwrap();
    for branch in 0..matrix.num_branches() {
        assert!(
            winner
                .selected
                .iter()
                .any(|&test| matrix.is_covered(test, branch)),
            "branch {} left uncovered",
            matrix.branch_ids()[branch]
        );
    }
}

#[test]
fn test_infeasible_branch_reported_under_boolean_override() {
    let extraction = extract("if (x > 5) { f(); }").unwrap();
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "x".to_string(),
        vec![Value::Bool(false), Value::Bool(true)],
    );
    let universe =
        generate_test_cases(&extraction.branches, &extraction.variables, Some(&overrides));
    let (matrix, feasibility) = build_matrix(&universe, &extraction.branches);

    assert!(!feasibility.is_fully_feasible());
    assert_eq!(feasibility.infeasible_branches, vec!["if_0".to_string()]);

    // The solvers still run; they just cannot reach 100%.
    let results = compare_all(&matrix);
    for result in &results {
        assert_eq!(result.coverage_percentage, 0.0, "{}", result.algorithm);
    }
}

#[test]
fn test_pipeline_is_deterministic() {
    let run = || {
        let extraction = extract(THREE_PREDICATES).unwrap();
        let universe =
            generate_test_cases(&extraction.branches, &extraction.variables, None);
        let (matrix, _) = build_matrix(&universe, &extraction.branches);
        let winner = best_of_all(&matrix).unwrap();
        (extraction, universe, winner.selected, winner.algorithm)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_report_survives_json_round_trip() {
    let extraction = extract(THREE_PREDICATES).unwrap();
    let universe = generate_test_cases(&extraction.branches, &extraction.variables, None);
    let (matrix, feasibility) = build_matrix(&universe, &extraction.branches);
    let winner = best_of_all(&matrix).unwrap();

    let report = ReductionReport::new(
        "three_predicates.src",
        &winner,
        &universe,
        &extraction.branches,
        &feasibility,
    );
    assert_eq!(report.original_test_count, 8);
    assert_eq!(report.reduced_test_count, winner.selected.len());
    assert_eq!(report.branches.len(), 3);

    let json = report.to_json().unwrap();
    let parsed = ReductionReport::from_json(&json).unwrap();
    assert_eq!(parsed, report);
}

#[test]
fn test_unparseable_conditionals_are_a_parse_failure() {
    // The structural pass rejects the unparenthesized predicate and the
    // pattern fallback finds no `if (...)` shape either.
    let err = extract("if x > 5 then stop").unwrap_err();
    assert!(matches!(err, CovminError::ParseFailure(_)));
}
