//! Run every reduction algorithm over one matrix and pick the best
//!
//! The three approximate solvers always run, in parallel, since each is a
//! pure function of the matrix. The exhaustive solver joins them only for
//! small inputs: beyond [`OPTIMAL_TEST_LIMIT`] candidate tests its
//! combination count grows too fast to be worth the budget, and a failed
//! exhaustive run is skipped rather than surfaced as an error.

use rayon::prelude::*;
use tracing::debug;

use crate::matrix::CoverageMatrix;
use crate::reduce::{self, ReductionResult, DEFAULT_COMBINATION_BUDGET};

/// Candidate-test ceiling above which the exhaustive solver is skipped
pub const OPTIMAL_TEST_LIMIT: usize = 15;

/// Run all applicable algorithms and return their results in declaration
/// order: greedy, intelligent, heuristic, then optimal when it ran and
/// succeeded
///
/// The result order is a published contract: [`best`] breaks ties by
/// position, so the ordering decides which algorithm wins when several
/// reach the same reduced size.
pub fn compare_all(matrix: &CoverageMatrix) -> Vec<ReductionResult> {
    let approximate: [fn(&CoverageMatrix) -> ReductionResult; 3] =
        [reduce::greedy, reduce::intelligent, reduce::heuristic];
    // par_iter preserves input order in the collected output.
    let mut results: Vec<ReductionResult> = approximate
        .par_iter()
        .map(|solver| solver(matrix))
        .collect();

    if matrix.num_tests() <= OPTIMAL_TEST_LIMIT {
        match reduce::optimal(matrix, DEFAULT_COMBINATION_BUDGET) {
            Ok(result) => results.push(result),
            Err(err) => {
                debug!(%err, "exhaustive solver skipped in comparison");
            }
        }
    } else {
        debug!(
            num_tests = matrix.num_tests(),
            limit = OPTIMAL_TEST_LIMIT,
            "too many candidates for the exhaustive solver"
        );
    }
    results
}

/// The result with the smallest reduction ratio, first on ties
pub fn best(results: &[ReductionResult]) -> Option<&ReductionResult> {
    results.iter().reduce(|best, candidate| {
        if candidate.reduction_ratio < best.reduction_ratio {
            candidate
        } else {
            best
        }
    })
}

/// Convenience wrapper: run the comparison and return the winner
pub fn best_of_all(matrix: &CoverageMatrix) -> Option<ReductionResult> {
    let results = compare_all(matrix);
    best(&results).cloned()
}
