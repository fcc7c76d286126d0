//! HTTP clients for the resource-metadata and execution services.
//!
//! Both clients forward the caller's `Authorization` header unchanged and
//! apply a single per-request timeout. They never retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client as HttpClient, RequestBuilder, StatusCode};
use snipauth_domain::clients::{ClientError, ClientResult, ExecutionClient, ResourceClient};
use snipauth_domain::model::{
    ExecutionOutput, ExecutionReply, ExecutionRequest, ResourceDescriptor, ResourcePage,
};
use tracing::{debug, warn};

fn build_http_client(timeout_ms: u64) -> ClientResult<HttpClient> {
    HttpClient::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| ClientError::RequestFailed(e.to_string()))
}

fn with_auth(request: RequestBuilder, auth_token: &str) -> RequestBuilder {
    if auth_token.is_empty() {
        request
    } else {
        request.header(AUTHORIZATION, auth_token)
    }
}

/// Client for the resource-metadata service.
pub struct HttpResourceClient {
    http_client: HttpClient,
    base_url: String,
}

impl HttpResourceClient {
    /// Creates a client rooted at `base_url` (e.g. "http://snippet-manager:8080").
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> ClientResult<Self> {
        Ok(Self {
            http_client: build_http_client(timeout_ms)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn get_resource(
        &self,
        resource_id: &str,
        auth_token: &str,
    ) -> ClientResult<Option<ResourceDescriptor>> {
        let url = format!("{}/manager/snippet/get/{}", self.base_url, resource_id);
        debug!(%url, "fetching resource");

        let response = with_auth(self.http_client.get(&url), auth_token)
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let descriptor = response
                    .json::<ResourceDescriptor>()
                    .await
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
                Ok(Some(descriptor))
            }
            // unknown ids come back as 404 or as an empty body
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            status => {
                warn!(status = status.as_u16(), "resource service returned unexpected status");
                Err(ClientError::UnexpectedStatus(status.as_u16()))
            }
        }
    }

    async fn list_resources(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
        auth_token: &str,
    ) -> ClientResult<ResourcePage> {
        let url = format!("{}/manager/snippet/snippets", self.base_url);
        let request = self.http_client.get(&url).query(&[
            ("userId", user_id.to_string()),
            ("page", page.to_string()),
            ("pageSize", page_size.to_string()),
        ]);

        let response = with_auth(request, auth_token)
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<ResourcePage>()
                .await
                .map_err(|e| ClientError::InvalidResponse(e.to_string())),
            status => {
                warn!(status = status.as_u16(), "resource listing returned unexpected status");
                Err(ClientError::UnexpectedStatus(status.as_u16()))
            }
        }
    }
}

/// Client for the execution service.
pub struct HttpExecutionClient {
    http_client: HttpClient,
    base_url: String,
}

impl HttpExecutionClient {
    /// Creates a client rooted at `base_url` (e.g. "http://snippet-runner:8080").
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> ClientResult<Self> {
        Ok(Self {
            http_client: build_http_client(timeout_ms)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ExecutionClient for HttpExecutionClient {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        auth_token: &str,
    ) -> ClientResult<ExecutionReply> {
        let url = format!("{}/runner/execute", self.base_url);

        let response = with_auth(self.http_client.post(&url).json(request), auth_token)
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(ExecutionReply {
                status: status.as_u16(),
                body: None,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        let body = decode_output(&bytes)?;

        Ok(ExecutionReply {
            status: status.as_u16(),
            body,
        })
    }
}

/// Decodes a success body. Empty, blank and `null` bodies carry no output.
fn decode_output(bytes: &[u8]) -> ClientResult<Option<ExecutionOutput>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<ExecutionOutput>>(bytes)
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))
}
