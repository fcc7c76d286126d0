//! Traits for the collaborator services the engines call out to.
//!
//! Both clients are stateless proxies. Transport failures surface as
//! [`ClientError`] and are never retried here; retry and timeout policy
//! belongs to the implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ExecutionReply, ExecutionRequest, ResourcePage, ResourceDescriptor};

/// Errors raised by outbound service calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The service answered with a status the client does not handle.
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
}

/// Result type for outbound service calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Outbound calls to the resource-metadata service.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetches one resource. Returns `None` when the service does not know it.
    async fn get_resource(
        &self,
        resource_id: &str,
        auth_token: &str,
    ) -> ClientResult<Option<ResourceDescriptor>>;

    /// Lists the resources visible to a user, one page at a time.
    async fn list_resources(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
        auth_token: &str,
    ) -> ClientResult<ResourcePage>;
}

/// Outbound calls to the execution service.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Runs the submitted content and reports the raw reply.
    ///
    /// A non-success status is returned as a reply, not as an error, so the
    /// caller decides how to classify it.
    async fn execute(
        &self,
        request: &ExecutionRequest,
        auth_token: &str,
    ) -> ClientResult<ExecutionReply>;
}
