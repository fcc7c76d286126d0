//! Domain error types for the authorization and orchestration core.

use snipauth_storage::StorageError;
use thiserror::Error;

use crate::clients::ClientError;

/// Domain-specific errors, one variant per failure the engines can raise.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Permission name is not one of READ, WRITE, OWNER.
    #[error("unknown permission kind: {value}")]
    UnknownPermissionKind { value: String },

    /// The requester lacks the OWNER kind on the resource.
    #[error("user '{user_id}' does not own resource '{resource_id}'")]
    NotOwner {
        user_id: String,
        resource_id: String,
    },

    /// The resource-metadata service has no such resource.
    #[error("resource not found: {resource_id}")]
    ResourceNotFound { resource_id: String },

    /// Rule delete target is missing.
    #[error("rule not found: {rule_id}")]
    RuleNotFound { rule_id: String },

    /// Rule delete target belongs to another user.
    #[error("user '{user_id}' may not modify rule '{rule_id}'")]
    UnauthorizedAccess { user_id: String, rule_id: String },

    /// Test case is missing.
    #[error("test case not found: {test_case_id}")]
    TestCaseNotFound { test_case_id: String },

    /// The execution service answered without a usable result.
    #[error("execution failed: {reason}")]
    ExecutionFailed { reason: String },

    /// Unclassified failure talking to a collaborator service.
    #[error("{service} request failed: {source}")]
    Upstream {
        service: &'static str,
        #[source]
        source: ClientError,
    },

    /// Failure in the local store.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
