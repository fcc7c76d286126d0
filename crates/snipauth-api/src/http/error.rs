//! API error format and the mapping from engine errors to HTTP statuses.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::error;

use snipauth_domain::DomainError;
use snipauth_storage::StorageError;

/// Stable error codes carried in the `code` field of every error body.
pub mod error_codes {
    // 400
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const UNKNOWN_PERMISSION_KIND: &str = "unknown_permission_kind";

    // 401 / 403
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    pub const NOT_OWNER: &str = "not_owner";
    pub const UNAUTHORIZED_ACCESS: &str = "unauthorized_access";

    // 404
    pub const RESOURCE_NOT_FOUND: &str = "resource_not_found";
    pub const RULE_NOT_FOUND: &str = "rule_not_found";
    pub const TEST_CASE_NOT_FOUND: &str = "test_case_not_found";

    // 413
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";

    // 5xx
    pub const EXECUTION_FAILED: &str = "execution_failed";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::VALIDATION_ERROR, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(error_codes::UNAUTHENTICATED, message)
    }

    pub fn test_case_not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::TEST_CASE_NOT_FOUND, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        use error_codes::*;

        match self.code.as_str() {
            VALIDATION_ERROR | UNKNOWN_PERMISSION_KIND => StatusCode::BAD_REQUEST,
            UNAUTHENTICATED => StatusCode::UNAUTHORIZED,
            NOT_OWNER | UNAUTHORIZED_ACCESS => StatusCode::FORBIDDEN,
            RESOURCE_NOT_FOUND | RULE_NOT_FOUND | TEST_CASE_NOT_FOUND => StatusCode::NOT_FOUND,
            PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            EXECUTION_FAILED | UPSTREAM_ERROR => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidInput { message } => ApiError::validation_error(message),
            StorageError::RuleNotFound { rule_id } => {
                ApiError::new(error_codes::RULE_NOT_FOUND, format!("rule not found: {rule_id}"))
            }
            StorageError::TestCaseNotFound { test_case_id } => {
                ApiError::test_case_not_found(format!("test case not found: {test_case_id}"))
            }
            other => {
                error!("Storage error: {}", other);
                ApiError::internal_error("internal storage error")
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        use error_codes::*;

        match err {
            DomainError::UnknownPermissionKind { .. } => {
                ApiError::new(UNKNOWN_PERMISSION_KIND, err.to_string())
            }
            DomainError::NotOwner { .. } => ApiError::new(NOT_OWNER, err.to_string()),
            DomainError::ResourceNotFound { .. } => {
                ApiError::new(RESOURCE_NOT_FOUND, err.to_string())
            }
            DomainError::RuleNotFound { .. } => ApiError::new(RULE_NOT_FOUND, err.to_string()),
            DomainError::UnauthorizedAccess { .. } => {
                ApiError::new(UNAUTHORIZED_ACCESS, err.to_string())
            }
            DomainError::TestCaseNotFound { .. } => ApiError::test_case_not_found(err.to_string()),
            DomainError::ExecutionFailed { .. } => {
                error!("Execution failed: {}", err);
                ApiError::new(EXECUTION_FAILED, err.to_string())
            }
            DomainError::Upstream { service, .. } => {
                // transport details stay in the log
                error!("Upstream failure: {}", err);
                ApiError::new(UPSTREAM_ERROR, format!("{service} unavailable"))
            }
            DomainError::Storage(storage) => storage.into(),
        }
    }
}

/// Result type for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// JSON extractor that rejects malformed bodies with 400 instead of 422.
///
/// Body limit rejections keep their 413.
pub struct JsonBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBadRequest(value)),
            Err(rejection) => {
                let too_large = matches!(rejection, JsonRejection::BytesRejection(_))
                    && rejection.status() == StatusCode::PAYLOAD_TOO_LARGE;
                let message = rejection.body_text();
                if too_large {
                    Err(ApiError::new(error_codes::PAYLOAD_TOO_LARGE, message))
                } else {
                    Err(ApiError::validation_error(message))
                }
            }
        }
    }
}

/// Query-string extractor that reports malformed parameters in the JSON
/// error format.
pub struct QueryBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryBadRequest(value))
            .map_err(|rejection| ApiError::validation_error(rejection.body_text()))
    }
}
