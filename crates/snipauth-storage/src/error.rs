//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Rule not found.
    #[error("rule not found: {rule_id}")]
    RuleNotFound { rule_id: String },

    /// Test case not found.
    #[error("test case not found: {test_case_id}")]
    TestCaseNotFound { test_case_id: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Internal error, e.g. a poisoned rule-table lock.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
