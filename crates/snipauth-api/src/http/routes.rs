//! HTTP route definitions and handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::error;

use snipauth_domain::model::{AccessibleUsers, RuleInput, TestCaseDefinition};
use snipauth_storage::{DataStore, DateTime, Grant, PermissionKind, Rule, RuleType, TestCase, Utc};

use crate::middleware::{cors_layer, CorrelationIdLayer, RequestLoggingLayer};

use super::caller::Caller;
use super::error::{ApiError, ApiResult, JsonBadRequest, QueryBadRequest};
use super::state::AppState;

/// Default request body size limit (1MB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

fn api_routes<S: DataStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        // Grants and sharing
        .route("/permissions", post(assert_permission::<S>))
        .route("/permissions/query", post(list_granted_kinds::<S>))
        .route("/permissions/resources", get(list_resources::<S>))
        .route(
            "/permissions/resources/:resource_id/share",
            post(share_resource::<S>),
        )
        .route("/permissions/friends", get(list_accessible_users::<S>))
        // Rules: the segment is a rule type for GET/POST and a rule id for DELETE
        .route(
            "/rules/:segment",
            get(list_rules::<S>)
                .post(upsert_rules::<S>)
                .delete(delete_rule::<S>),
        )
        // Test cases
        .route(
            "/testcases",
            post(create_test_case::<S>).get(list_test_cases::<S>),
        )
        .route("/testcases/execute", post(execute_test_case::<S>))
        .route(
            "/testcases/:id",
            get(get_test_case::<S>).delete(delete_test_case::<S>),
        )
        .route("/testcases/:id/execute", post(run_stored_test_case::<S>))
}

/// Creates the HTTP router with the default body size limit.
pub fn create_router<S: DataStore>(state: AppState<S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit in bytes.
pub fn create_router_with_body_limit<S: DataStore>(
    state: AppState<S>,
    body_limit: usize,
) -> Router {
    let shared_state = Arc::new(state);
    api_routes::<S>()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check::<S>))
        .with_state(shared_state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(RequestLoggingLayer::new())
        .layer(cors_layer())
        // outermost, so the span covers every other layer
        .layer(CorrelationIdLayer::new())
}

// ============================================================
// Health and Readiness Checks
// ============================================================

/// Liveness probe. Does not touch dependencies.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness probe: 200 when the store answers, 503 otherwise.
async fn readiness_check<S: DataStore>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    match state.storage.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "checks": { "storage": "ok" }
            })),
        ),
        Err(e) => {
            error!("Readiness check failed: storage unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "checks": { "storage": "unavailable" }
                })),
            )
        }
    }
}

// ============================================================
// Paging
// ============================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl PageQuery {
    fn validate(&self) -> ApiResult<()> {
        if self.page_size == 0 {
            return Err(ApiError::validation_error("pageSize must be positive"));
        }
        Ok(())
    }
}

// ============================================================
// Grants and Sharing
// ============================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertPermissionRequest {
    pub user_id: String,
    #[serde(alias = "snippetId")]
    pub resource_id: String,
    /// Kind name; validated by the engine so unknown names get a typed error.
    #[serde(alias = "permissionKind")]
    pub permission_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantQueryRequest {
    pub user_id: String,
    #[serde(alias = "snippetId")]
    pub resource_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    /// The user receiving access.
    #[serde(alias = "targetUserId")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsQuery {
    pub name_prefix: Option<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantResponse {
    pub id: String,
    pub user_id: String,
    pub resource_id: String,
    pub permissions: Vec<PermissionKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Grant> for GrantResponse {
    fn from(grant: Grant) -> Self {
        Self {
            id: grant.id,
            user_id: grant.user_id,
            resource_id: grant.resource_id,
            permissions: grant.kinds.into_iter().collect(),
            created_at: grant.created_at,
            updated_at: grant.updated_at,
        }
    }
}

async fn assert_permission<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    JsonBadRequest(body): JsonBadRequest<AssertPermissionRequest>,
) -> ApiResult<impl IntoResponse> {
    let grant = state
        .authorization
        .assert_permission(&body.user_id, &body.resource_id, &body.permission_type)
        .await?;
    Ok((StatusCode::CREATED, Json(GrantResponse::from(grant))))
}

async fn list_granted_kinds<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    JsonBadRequest(body): JsonBadRequest<GrantQueryRequest>,
) -> ApiResult<impl IntoResponse> {
    let kinds = state
        .authorization
        .list_granted_kinds(&body.user_id, &body.resource_id)
        .await?;
    Ok(Json(kinds.into_iter().collect::<Vec<_>>()))
}

async fn list_resources<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    QueryBadRequest(query): QueryBadRequest<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    query.validate()?;
    let page = state
        .authorization
        .list_resources(&caller.user_id, query.page, query.page_size, &caller.auth_token)
        .await?;
    Ok(Json(page))
}

async fn share_resource<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(resource_id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<ShareRequest>,
) -> ApiResult<impl IntoResponse> {
    let resource = state
        .authorization
        .share_resource(&resource_id, &caller.user_id, &body.user_id, &caller.auth_token)
        .await?;
    Ok(Json(resource))
}

async fn list_accessible_users<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    QueryBadRequest(query): QueryBadRequest<FriendsQuery>,
) -> ApiResult<impl IntoResponse> {
    let paging = PageQuery {
        page: query.page,
        page_size: query.page_size,
    };
    paging.validate()?;
    let mut result = state
        .authorization
        .list_accessible_users(&caller.user_id, paging.page, paging.page_size)
        .await?;

    // total keeps counting grant rows; only the page is filtered
    if let Some(prefix) = query.name_prefix.as_deref().filter(|p| !p.is_empty()) {
        result.users.retain(|user| user.starts_with(prefix));
    }
    Ok(Json::<AccessibleUsers>(result))
}

// ============================================================
// Rules
// ============================================================

/// Wire form of a stored rule.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResponse {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub value: Option<String>,
}

impl From<Rule> for RuleResponse {
    fn from(rule: Rule) -> Self {
        RuleResponse {
            id: rule.id,
            name: rule.name,
            is_active: rule.is_active,
            value: rule.value,
        }
    }
}

fn parse_rule_type(segment: &str) -> ApiResult<RuleType> {
    match segment.to_ascii_lowercase().as_str() {
        "format" => Ok(RuleType::Format),
        "lint" => Ok(RuleType::Lint),
        _ => Err(ApiError::validation_error(format!(
            "unknown rule type: {segment}"
        ))),
    }
}

async fn upsert_rules<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(segment): Path<String>,
    JsonBadRequest(items): JsonBadRequest<Vec<RuleInput>>,
) -> ApiResult<impl IntoResponse> {
    let rule_type = parse_rule_type(&segment)?;
    let saved = state
        .rules
        .upsert_rules(&caller.user_id, rule_type, items)
        .await?;
    Ok(Json(saved.into_iter().map(RuleResponse::from).collect::<Vec<_>>()))
}

async fn list_rules<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(segment): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let rule_type = parse_rule_type(&segment)?;
    let rules = state.rules.list_rules(&caller.user_id, rule_type).await?;
    Ok(Json(rules.into_iter().map(RuleResponse::from).collect::<Vec<_>>()))
}

async fn delete_rule<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(rule_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.rules.delete_rule(&caller.user_id, &rule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Test Cases
// ============================================================

/// Test case as submitted by clients.
///
/// Older clients send the resource id in `id` and omit `resourceId`; in
/// that form `id` names the resource, not a stored test case.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub output: Vec<String>,
}

impl TestCaseRequest {
    fn into_definition(self) -> ApiResult<TestCaseDefinition> {
        let (id, resource_id) = match (self.id, self.resource_id) {
            (id, Some(resource_id)) => (id, resource_id),
            (Some(resource_id), None) => (None, resource_id),
            (None, None) => return Err(ApiError::validation_error("resourceId is required")),
        };
        if resource_id.trim().is_empty() {
            return Err(ApiError::validation_error("resourceId must not be empty"));
        }

        Ok(TestCaseDefinition {
            id,
            name: self.name,
            resource_id,
            input: self.input,
            output: self.output,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResponse {
    pub id: String,
    pub name: String,
    pub resource_id: String,
    pub input: Vec<String>,
    pub output: Vec<String>,
}

impl From<TestCase> for TestCaseResponse {
    fn from(test_case: TestCase) -> Self {
        Self {
            id: test_case.id,
            name: test_case.name,
            resource_id: test_case.resource_id,
            input: test_case.input,
            output: test_case.output,
        }
    }
}

async fn create_test_case<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    JsonBadRequest(body): JsonBadRequest<TestCaseRequest>,
) -> ApiResult<impl IntoResponse> {
    let definition = body.into_definition()?;
    let created = state
        .test_cases
        .create_test_case(definition, &caller.auth_token)
        .await?;
    Ok((StatusCode::CREATED, Json(TestCaseResponse::from(created))))
}

async fn list_test_cases<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
) -> ApiResult<impl IntoResponse> {
    let test_cases = state.test_cases.list_test_cases().await?;
    Ok(Json(
        test_cases
            .into_iter()
            .map(TestCaseResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn get_test_case<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let test_case = state
        .test_cases
        .get_test_case(&id)
        .await?
        .ok_or_else(|| ApiError::test_case_not_found(format!("test case not found: {id}")))?;
    Ok(Json(TestCaseResponse::from(test_case)))
}

async fn delete_test_case<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.test_cases.delete_test_case(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn execute_test_case<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    JsonBadRequest(body): JsonBadRequest<TestCaseRequest>,
) -> ApiResult<impl IntoResponse> {
    let definition = body.into_definition()?;
    let result = state
        .test_cases
        .execute_test_case(definition, &caller.auth_token)
        .await?;
    Ok(Json(result))
}

async fn run_stored_test_case<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .test_cases
        .run_stored_test_case(&id, &caller.auth_token)
        .await?;
    Ok(Json(result))
}
