//! Error types for pta-core
//!
//! Provides unified error handling across the crate.

use crate::features::solver::result::PointerAnalysisResult;
use thiserror::Error;

/// Main error type for pointer-analysis operations
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Invalid or unknown configuration, rejected before solving starts
    #[error("Configuration error: {0}")]
    Config(String),

    /// An IR construct the engine has no transfer rule for.
    ///
    /// This is fatal on purpose: silently approximating an unknown
    /// construct would produce an unsound result that looks correct.
    #[error("Unsupported IR construct: {0}")]
    UnsupportedIr(String),

    /// The solver's step budget expired before reaching a fixed point.
    ///
    /// Carries the partial result so callers can distinguish a deliberate
    /// partial answer from a crash. `partial.is_complete()` is `false`.
    #[error("Analysis step budget exhausted after {steps} steps")]
    Timeout {
        steps: u64,
        partial: Box<PointerAnalysisResult>,
    },
}

/// Result type alias for pointer-analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
