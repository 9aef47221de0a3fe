//! Set-cover solvers for test-set reduction
//!
//! Minimizing a test set while keeping every branch covered is the classic
//! unweighted set-cover problem: the universe is the branch set, each test
//! case contributes the set of branches it covers, and the objective is the
//! fewest tests whose union is the universe. Set cover is NP-hard, so four
//! complementary strategies are offered:
//!
//! - [`greedy`] — ln(n)-approximation, largest marginal gain first
//! - [`intelligent`] — frequency-weighted single-pass scan
//! - [`optimal`] — bounded exhaustive search, true minimum when it returns
//! - [`heuristic`] — greedy seed plus local removal until irredundant
//!
//! Greedy, intelligent, and heuristic are polynomial in tests × branches;
//! optimal is combinatorial and is the only solver with an explicit
//! resource cap (subset-size ceiling and combination budget). Every solver
//! is a pure function of the matrix, so all four can safely run in
//! parallel over the same input.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{CovminError, CovminResult};
use crate::matrix::CoverageMatrix;

/// Subset-size ceiling for the exhaustive search
pub const MAX_OPTIMAL_SUBSET: usize = 20;

/// Default cap on combinations the exhaustive search may inspect
pub const DEFAULT_COMBINATION_BUDGET: u64 = 1_000_000;

/// The available reduction algorithms, in comparison declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Greedy,
    Intelligent,
    Heuristic,
    Optimal,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Greedy,
        Algorithm::Intelligent,
        Algorithm::Heuristic,
        Algorithm::Optimal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Greedy => "greedy",
            Algorithm::Intelligent => "intelligent",
            Algorithm::Heuristic => "heuristic",
            Algorithm::Optimal => "optimal",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = CovminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "greedy" => Ok(Algorithm::Greedy),
            "intelligent" => Ok(Algorithm::Intelligent),
            "heuristic" => Ok(Algorithm::Heuristic),
            "optimal" => Ok(Algorithm::Optimal),
            other => Err(CovminError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Outcome of one reduction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionResult {
    /// Row indices of the selected test cases, in selection order
    pub selected: Vec<usize>,
    /// Covered branches over all branches, as a percentage; 100.0 only when
    /// every branch column has a selected covering row
    pub coverage_percentage: f64,
    /// Selected test count over original candidate count
    pub reduction_ratio: f64,
    pub algorithm: Algorithm,
    /// Wall-clock solver time, for observability only
    pub elapsed: Duration,
}

impl ReductionResult {
    fn new(
        algorithm: Algorithm,
        selected: Vec<usize>,
        covered_count: usize,
        num_branches: usize,
        num_tests: usize,
        elapsed: Duration,
    ) -> Self {
        let coverage_percentage = if num_branches == 0 {
            100.0
        } else {
            covered_count as f64 / num_branches as f64 * 100.0
        };
        let reduction_ratio = if num_tests == 0 {
            0.0
        } else {
            selected.len() as f64 / num_tests as f64
        };
        Self {
            selected,
            coverage_percentage,
            reduction_ratio,
            algorithm,
            elapsed,
        }
    }

    /// Names of the selected test cases, resolved against the matrix the
    /// result was computed from
    pub fn selected_names(&self, matrix: &CoverageMatrix) -> Vec<String> {
        self.selected
            .iter()
            .filter_map(|&t| matrix.test_names().get(t).cloned())
            .collect()
    }
}

/// Dispatch to one solver by algorithm
///
/// `optimal` runs under [`DEFAULT_COMBINATION_BUDGET`] and may fail with
/// [`CovminError::BudgetExceeded`] or [`CovminError::NoFullCover`]; the
/// caller chooses the approximate fallback explicitly.
pub fn solve(matrix: &CoverageMatrix, algorithm: Algorithm) -> CovminResult<ReductionResult> {
    match algorithm {
        Algorithm::Greedy => Ok(greedy(matrix)),
        Algorithm::Intelligent => Ok(intelligent(matrix)),
        Algorithm::Heuristic => Ok(heuristic(matrix)),
        Algorithm::Optimal => optimal(matrix, DEFAULT_COMBINATION_BUDGET),
    }
}

/// Greedy set cover: repeatedly select the test covering the most
/// currently-uncovered branches, first-found on ties
///
/// Terminates when all branches are covered or no remaining test adds
/// coverage; the latter leaves coverage below 100% (infeasible branches)
/// and is reported through the result, not hidden.
pub fn greedy(matrix: &CoverageMatrix) -> ReductionResult {
    let start = Instant::now();
    let num_tests = matrix.num_tests();
    let num_branches = matrix.num_branches();

    let mut covered = vec![false; num_branches];
    let mut covered_count = 0usize;
    let mut available = vec![true; num_tests];
    let mut selected = Vec::new();

    while covered_count < num_branches {
        let mut best_test = None;
        let mut best_gain = 0usize;
        for test in (0..num_tests).filter(|&t| available[t]) {
            let gain = matrix
                .row(test)
                .iter()
                .zip(&covered)
                .filter(|(&hit, &already)| hit && !already)
                .count();
            if gain > best_gain {
                best_gain = gain;
                best_test = Some(test);
            }
        }
        let Some(test) = best_test else {
            debug!(
                covered = covered_count,
                total = num_branches,
                "greedy stalled: remaining branches are infeasible"
            );
            break;
        };
        selected.push(test);
        available[test] = false;
        for (branch, hit) in matrix.row(test).iter().enumerate() {
            if *hit && !covered[branch] {
                covered[branch] = true;
                covered_count += 1;
            }
        }
    }

    ReductionResult::new(
        Algorithm::Greedy,
        selected,
        covered_count,
        num_branches,
        num_tests,
        start.elapsed(),
    )
}

/// Frequency-weighted greedy: score each test by the mean reciprocal
/// frequency of the branches it covers, then scan once in descending-score
/// order selecting any test that still adds coverage
///
/// Rarely-covered branches weigh the tests that reach them up, so unique
/// coverers tend to be picked early. Deterministic: ties keep original
/// index order.
pub fn intelligent(matrix: &CoverageMatrix) -> ReductionResult {
    let start = Instant::now();
    let num_tests = matrix.num_tests();
    let num_branches = matrix.num_branches();

    // How many tests cover each branch.
    let mut frequency = vec![0usize; num_branches];
    for test in 0..num_tests {
        for (branch, hit) in matrix.row(test).iter().enumerate() {
            if *hit {
                frequency[branch] += 1;
            }
        }
    }

    let mut scored: Vec<(usize, f64)> = (0..num_tests)
        .map(|test| {
            let mut score = 0.0f64;
            let mut covered_by_test = 0usize;
            for (branch, hit) in matrix.row(test).iter().enumerate() {
                if *hit {
                    covered_by_test += 1;
                    if frequency[branch] > 0 {
                        score += 1.0 / frequency[branch] as f64;
                    }
                }
            }
            if covered_by_test > 0 {
                score /= covered_by_test as f64;
            }
            (test, score)
        })
        .collect();
    // Stable sort keeps original index order on equal scores.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut covered = vec![false; num_branches];
    let mut covered_count = 0usize;
    let mut selected = Vec::new();
    for (test, _) in scored {
        if covered_count == num_branches {
            break;
        }
        let adds_coverage = matrix
            .row(test)
            .iter()
            .zip(&covered)
            .any(|(&hit, &already)| hit && !already);
        if !adds_coverage {
            continue;
        }
        selected.push(test);
        for (branch, hit) in matrix.row(test).iter().enumerate() {
            if *hit && !covered[branch] {
                covered[branch] = true;
                covered_count += 1;
            }
        }
    }

    ReductionResult::new(
        Algorithm::Intelligent,
        selected,
        covered_count,
        num_branches,
        num_tests,
        start.elapsed(),
    )
}

/// Bounded exhaustive search: the true minimum-cardinality cover when it
/// returns
///
/// Enumerates k-combinations of test indices in lexicographic order for
/// k = 1 up to [`MAX_OPTIMAL_SUBSET`], accepting the first combination
/// whose union covers every branch. `max_combinations` bounds the total
/// number of combinations inspected. The two failure modes are distinct:
/// [`CovminError::BudgetExceeded`] means the budget ran out with sizes
/// still unexamined, while [`CovminError::NoFullCover`] means every size up
/// to the ceiling was fully enumerated without success.
pub fn optimal(matrix: &CoverageMatrix, max_combinations: u64) -> CovminResult<ReductionResult> {
    let start = Instant::now();
    let num_tests = matrix.num_tests();
    let num_branches = matrix.num_branches();

    if num_branches == 0 {
        return Ok(ReductionResult::new(
            Algorithm::Optimal,
            Vec::new(),
            0,
            0,
            num_tests,
            start.elapsed(),
        ));
    }

    let ceiling = num_tests.min(MAX_OPTIMAL_SUBSET);
    let mut inspected = 0u64;
    for size in 1..=ceiling {
        let mut indices: Vec<usize> = (0..size).collect();
        loop {
            if inspected == max_combinations {
                debug!(inspected, size, "combination budget exhausted");
                return Err(CovminError::BudgetExceeded { inspected });
            }
            inspected += 1;
            if covers_all(matrix, &indices) {
                debug!(size, inspected, "exhaustive search found minimum cover");
                return Ok(ReductionResult::new(
                    Algorithm::Optimal,
                    indices,
                    num_branches,
                    num_branches,
                    num_tests,
                    start.elapsed(),
                ));
            }
            if !next_combination(&mut indices, num_tests) {
                break;
            }
        }
    }
    Err(CovminError::NoFullCover { max_size: ceiling })
}

/// Greedy seed plus local search: repeatedly drop any single selected test
/// whose removal keeps full coverage, restarting the scan after every
/// removal
///
/// The result is locally irredundant: removing any one remaining test
/// strictly reduces coverage. No optimality guarantee.
pub fn heuristic(matrix: &CoverageMatrix) -> ReductionResult {
    let start = Instant::now();
    let num_tests = matrix.num_tests();
    let num_branches = matrix.num_branches();

    let mut selected = greedy(matrix).selected;

    loop {
        let mut removed = false;
        for i in 0..selected.len() {
            let without: Vec<usize> = selected
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, &t)| t)
                .collect();
            if covers_all(matrix, &without) {
                selected = without;
                removed = true;
                break;
            }
        }
        if !removed {
            break;
        }
    }

    let covered_count = union_size(matrix, &selected);
    ReductionResult::new(
        Algorithm::Heuristic,
        selected,
        covered_count,
        num_branches,
        num_tests,
        start.elapsed(),
    )
}

/// Size of the union of covered branches across the given tests
fn union_size(matrix: &CoverageMatrix, tests: &[usize]) -> usize {
    let mut covered = vec![false; matrix.num_branches()];
    for &test in tests {
        for (branch, hit) in matrix.row(test).iter().enumerate() {
            if *hit {
                covered[branch] = true;
            }
        }
    }
    covered.iter().filter(|&&c| c).count()
}

fn covers_all(matrix: &CoverageMatrix, tests: &[usize]) -> bool {
    union_size(matrix, tests) == matrix.num_branches()
}

/// Advance to the lexicographic successor of a k-combination of 0..n
fn next_combination(indices: &mut [usize], n: usize) -> bool {
    let k = indices.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if indices[i] != i + n - k {
            indices[i] += 1;
            for j in i + 1..k {
                indices[j] = indices[j - 1] + 1;
            }
            return true;
        }
    }
    false
}
