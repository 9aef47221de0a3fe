//! Error types for branch extraction and test-set reduction

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum CovminError {
    /// Source could not be parsed structurally or by the pattern fallback
    #[error("parse failure: {0}")]
    ParseFailure(String),

    /// The exhaustive solver examined every subset size up to its ceiling
    /// without finding a full cover
    #[error("no full cover exists among subsets of size <= {max_size}")]
    NoFullCover { max_size: usize },

    /// The exhaustive solver's combination budget ran out before the search
    /// space was exhausted; an approximate algorithm should be used instead
    #[error("combination budget exhausted after inspecting {inspected} candidates")]
    BudgetExceeded { inspected: u64 },

    /// Unrecognized algorithm name at the `solve` seam
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Report serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for covmin operations
pub type CovminResult<T> = Result<T, CovminError>;
