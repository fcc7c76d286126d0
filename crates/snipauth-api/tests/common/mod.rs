//! Shared test utilities for snipauth API tests.
//!
//! Provides stub collaborator services and request helpers used across the
//! integration suites.

// Allow dead_code because helpers are used across different test files,
// but each test file is compiled as its own crate.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;

use snipauth_api::http::{create_router, AppState, USER_ID_HEADER};
use snipauth_domain::clients::{ClientError, ClientResult, ExecutionClient, ResourceClient};
use snipauth_domain::model::{
    ExecutionOutput, ExecutionReply, ExecutionRequest, ResourceDescriptor, ResourcePage,
};
use snipauth_storage::MemoryDataStore;

/// Token sent with every helper request.
pub const AUTH_TOKEN: &str = "Bearer integration-token";

/// Number of concurrent requests for race tests.
pub const CONCURRENT_REQUESTS: usize = 50;

/// Builds a resource descriptor owned by `author_id`.
pub fn resource(id: &str, author_id: &str) -> ResourceDescriptor {
    let created_at = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap();
    ResourceDescriptor {
        id: id.to_string(),
        name: format!("{id} snippet"),
        author_id: author_id.to_string(),
        created_at,
        content: "println(\"Hello\");".to_string(),
        language: "printscript".to_string(),
        language_version: "1.1".to_string(),
        is_valid: true,
        validation_errors: None,
    }
}

/// Resource service stub backed by a map.
#[derive(Default)]
pub struct StubResources {
    resources: Mutex<HashMap<String, ResourceDescriptor>>,
    unavailable: Mutex<bool>,
}

impl StubResources {
    pub fn add(&self, id: &str, author_id: &str) {
        self.resources
            .lock()
            .unwrap()
            .insert(id.to_string(), resource(id, author_id));
    }

    /// Makes every later call fail at the transport level.
    pub fn go_down(&self) {
        *self.unavailable.lock().unwrap() = true;
    }

    fn check_up(&self) -> ClientResult<()> {
        if *self.unavailable.lock().unwrap() {
            Err(ClientError::RequestFailed("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ResourceClient for StubResources {
    async fn get_resource(
        &self,
        resource_id: &str,
        _auth_token: &str,
    ) -> ClientResult<Option<ResourceDescriptor>> {
        self.check_up()?;
        Ok(self.resources.lock().unwrap().get(resource_id).cloned())
    }

    async fn list_resources(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
        _auth_token: &str,
    ) -> ClientResult<ResourcePage> {
        self.check_up()?;
        let mut owned: Vec<_> = self
            .resources
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.author_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.id.cmp(&b.id));

        let total_elements = owned.len() as u64;
        let total_pages = owned.len().div_ceil(page_size as usize) as u32;
        let items = owned
            .into_iter()
            .skip(page as usize * page_size as usize)
            .take(page_size as usize)
            .collect();
        Ok(ResourcePage {
            items,
            total_pages,
            total_elements,
        })
    }
}

/// Execution service stub replying with a fixed reply.
pub struct StubExecutor {
    reply: Mutex<ClientResult<ExecutionReply>>,
    requests: Mutex<Vec<(ExecutionRequest, String)>>,
}

impl StubExecutor {
    pub fn printing(lines: &[&str]) -> Self {
        Self {
            reply: Mutex::new(Ok(ExecutionReply::ok(ExecutionOutput {
                output: lines.iter().map(|l| l.to_string()).collect(),
                diagnostics: Vec::new(),
            }))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reply(&self, reply: ClientResult<ExecutionReply>) {
        *self.reply.lock().unwrap() = reply;
    }

    /// Requests received so far, with the forwarded token.
    pub fn requests(&self) -> Vec<(ExecutionRequest, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionClient for StubExecutor {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        auth_token: &str,
    ) -> ClientResult<ExecutionReply> {
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), auth_token.to_string()));
        self.reply.lock().unwrap().clone()
    }
}

/// A router wired to in-memory storage and stub services.
pub struct TestApp {
    pub router: Router,
    pub storage: Arc<MemoryDataStore>,
    pub resources: Arc<StubResources>,
    pub executor: Arc<StubExecutor>,
}

/// Creates a test app whose execution service prints `Hello`.
pub fn create_test_app() -> TestApp {
    let storage = MemoryDataStore::new_shared();
    let resources = Arc::new(StubResources::default());
    let executor = Arc::new(StubExecutor::printing(&["Hello"]));

    let state = AppState::new(
        Arc::clone(&storage),
        Arc::clone(&resources) as Arc<dyn ResourceClient>,
        Arc::clone(&executor) as Arc<dyn ExecutionClient>,
    );

    TestApp {
        router: create_router(state),
        storage,
        resources,
        executor,
    }
}

/// Creates a router over in-memory storage with the given collaborators.
pub fn create_router_with(
    resources: Arc<dyn ResourceClient>,
    executor: Arc<dyn ExecutionClient>,
) -> Router {
    create_router(AppState::new(
        MemoryDataStore::new_shared(),
        resources,
        executor,
    ))
}

/// Sends a request as `user_id` and returns status and JSON body.
///
/// Empty bodies come back as `Value::Null`.
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    user_id: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, user_id)
        .header("authorization", AUTH_TOKEN);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

impl TestApp {
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user_id: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send(&self.router, method, uri, user_id, body).await
    }

    pub async fn get(&self, uri: &str, user_id: &str) -> (StatusCode, Value) {
        self.send("GET", uri, user_id, None).await
    }

    pub async fn post(&self, uri: &str, user_id: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, user_id, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user_id: &str) -> (StatusCode, Value) {
        self.send("DELETE", uri, user_id, None).await
    }
}
