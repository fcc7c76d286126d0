//! Store trait definitions and persisted record types.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Maximum length for user, resource and record identifiers.
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

/// A capability a user holds over a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionKind {
    Owner,
    Read,
    Write,
}

impl PermissionKind {
    /// All recognized kinds.
    pub const ALL: [PermissionKind; 3] = [
        PermissionKind::Owner,
        PermissionKind::Read,
        PermissionKind::Write,
    ];

    /// Looks up a kind by its wire name (`"OWNER"`, `"READ"`, `"WRITE"`).
    ///
    /// Matching is exact; `"read"` is not a recognized name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Owner => "OWNER",
            PermissionKind::Read => "READ",
            PermissionKind::Write => "WRITE",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The category a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleType {
    Format,
    Lint,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Format => "FORMAT",
            RuleType::Lint => "LINT",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user's rights over one resource.
///
/// At most one grant exists per (user_id, resource_id) pair and its kind set
/// is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub id: String,
    pub user_id: String,
    pub resource_id: String,
    pub kinds: BTreeSet<PermissionKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Grant {
    /// Creates a grant holding a single kind.
    pub fn new(user_id: impl Into<String>, resource_id: impl Into<String>, kind: PermissionKind) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            resource_id: resource_id.into(),
            kinds: BTreeSet::from([kind]),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has(&self, kind: PermissionKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// A named configuration toggle for one user within one rule type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub is_active: bool,
    pub value: Option<String>,
    pub rule_type: RuleType,
}

impl Rule {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        rule_type: RuleType,
        is_active: bool,
        value: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            is_active,
            value,
            rule_type,
        }
    }
}

/// A named input / expected-output pair bound to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub resource_id: String,
    pub input: Vec<String>,
    pub output: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        resource_id: impl Into<String>,
        input: Vec<String>,
        output: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            resource_id: resource_id.into(),
            input,
            output,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> usize {
        (self.page as usize).saturating_mul(self.page_size as usize)
    }
}

/// One page of rows plus the total row count of the underlying query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Persistent mapping of (user, resource) to a set of permission kinds.
#[async_trait]
pub trait GrantStore: Send + Sync + 'static {
    /// Gets the grant for a (user, resource) pair, if any.
    async fn get_grant(&self, user_id: &str, resource_id: &str) -> StorageResult<Option<Grant>>;

    /// Atomically adds `kind` to the pair's grant, creating the grant if absent.
    ///
    /// Concurrent callers on the same pair never lose each other's kinds.
    /// When the kind is already present the stored grant is returned as-is.
    async fn add_kind(
        &self,
        user_id: &str,
        resource_id: &str,
        kind: PermissionKind,
    ) -> StorageResult<Grant>;

    /// Atomically creates a grant holding `kind` only if the pair has none.
    ///
    /// Returns the created grant, or `None` when a grant already existed.
    async fn insert_if_absent(
        &self,
        user_id: &str,
        resource_id: &str,
        kind: PermissionKind,
    ) -> StorageResult<Option<Grant>>;

    /// Pages the grants other users hold on resources `owner_id` owns.
    ///
    /// Rows are ordered by creation time then id. `total` counts every such
    /// row regardless of the kinds it holds.
    async fn page_shared_grants(
        &self,
        owner_id: &str,
        page: &PageRequest,
    ) -> StorageResult<Page<Grant>>;
}

/// Persistent mapping of (user, rule type, rule name) to rule state.
#[async_trait]
pub trait RuleStore: Send + Sync + 'static {
    async fn get_rule(&self, rule_id: &str) -> StorageResult<Option<Rule>>;

    async fn find_rule(
        &self,
        user_id: &str,
        name: &str,
        rule_type: RuleType,
    ) -> StorageResult<Option<Rule>>;

    /// Persists a batch of rules in one step.
    ///
    /// The (user_id, name, rule_type) key is unique: a rule whose key already
    /// belongs to another stored row updates that row in place and keeps its
    /// id. The result holds one rule per key: when a batch repeats a key,
    /// the later entry wins. The returned order is unspecified.
    async fn save_rules(&self, rules: Vec<Rule>) -> StorageResult<Vec<Rule>>;

    async fn list_rules(&self, user_id: &str, rule_type: RuleType) -> StorageResult<Vec<Rule>>;

    /// Deletes a rule by id. Fails with `RuleNotFound` when absent.
    async fn delete_rule(&self, rule_id: &str) -> StorageResult<()>;
}

/// Persistent mapping of test-case id to test-case definition.
#[async_trait]
pub trait TestCaseStore: Send + Sync + 'static {
    async fn save_test_case(&self, test_case: TestCase) -> StorageResult<TestCase>;

    async fn get_test_case(&self, id: &str) -> StorageResult<Option<TestCase>>;

    async fn list_test_cases(&self) -> StorageResult<Vec<TestCase>>;

    /// Deletes a test case by id. Fails with `TestCaseNotFound` when absent.
    async fn delete_test_case(&self, id: &str) -> StorageResult<()>;
}

/// A backend that serves all three tables.
#[async_trait]
pub trait DataStore: GrantStore + RuleStore + TestCaseStore {
    /// Cheap probe used by readiness checks.
    async fn health_check(&self) -> StorageResult<()>;
}

/// Validates a user, resource or record identifier.
pub fn validate_identifier(field: &str, value: &str) -> StorageResult<()> {
    if value.trim().is_empty() {
        return Err(StorageError::InvalidInput {
            message: format!("{field} cannot be empty"),
        });
    }
    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(StorageError::InvalidInput {
            message: format!("{field} exceeds maximum length of {MAX_IDENTIFIER_LENGTH}"),
        });
    }
    Ok(())
}

pub(crate) fn validate_page(page: &PageRequest) -> StorageResult<()> {
    if page.page_size == 0 {
        return Err(StorageError::InvalidInput {
            message: "page_size must be positive".to_string(),
        });
    }
    Ok(())
}
