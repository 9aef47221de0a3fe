//! Minimal test-set selection for full branch coverage
//!
//! This crate infers, from the conditional structure of a program, the
//! smallest set of input assignments that exercises every distinct decision
//! branch at least once. The pipeline has four stages:
//!
//! 1. [`extract`] — lex the source and walk its if/elif/else chains into a
//!    flat list of [`condition::Branch`]es, each the conjunction of the
//!    conditions guarding entry into its body
//! 2. [`generate`] — infer a finite candidate domain per variable and
//!    enumerate the Cartesian-product universe of test cases
//! 3. [`matrix`] — evaluate every test against every branch into a boolean
//!    coverage matrix, reporting infeasible branches
//! 4. [`reduce`] / [`compare`] — solve the resulting set-cover instance
//!    with one of four algorithms, or race them and keep the best
//!
//! ```
//! use covmin::{compare, extract, generate, matrix};
//!
//! let source = "if (x > 5 && ready) { open(); } else { hold(); }";
//! let extraction = extract::extract(source)?;
//! let universe =
//!     generate::generate_test_cases(&extraction.branches, &extraction.variables, None);
//! let (coverage, feasibility) = matrix::build_matrix(&universe, &extraction.branches);
//! assert!(feasibility.is_fully_feasible());
//!
//! let winner = compare::best_of_all(&coverage).unwrap();
//! assert_eq!(winner.coverage_percentage, 100.0);
//! # Ok::<(), covmin::CovminError>(())
//! ```

pub mod compare;
pub mod condition;
pub mod errors;
pub mod extract;
pub mod generate;
pub mod matrix;
pub mod reduce;
pub mod report;

pub use compare::{best, best_of_all, compare_all, OPTIMAL_TEST_LIMIT};
pub use condition::{Branch, CompareOp, Condition, Value};
pub use errors::{CovminError, CovminResult};
pub use extract::{extract, Extraction};
pub use generate::{generate_test_cases, infer_domains, TestCase};
pub use matrix::{build_matrix, CoverageMatrix, FeasibilityReport};
pub use reduce::{solve, Algorithm, ReductionResult};
pub use report::{ReductionReport, ReportedTestCase};
