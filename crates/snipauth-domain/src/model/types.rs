//! Engine inputs and listing results.

use serde::{Deserialize, Serialize};

/// One item of a rule batch upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleInput {
    /// Present when the caller believes the rule already exists.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub is_active: bool,
    #[serde(default)]
    pub value: Option<String>,
}

/// A test case as submitted for creation or execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseDefinition {
    /// Id of a stored test case, when the definition came from one.
    pub id: Option<String>,
    pub name: String,
    pub resource_id: String,
    pub input: Vec<String>,
    pub output: Vec<String>,
}

/// Users that hold READ or OWNER on any of an owner's resources.
///
/// `total` is the number of shared grant rows for the owner before kind
/// filtering, so it can exceed the number of users on every page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessibleUsers {
    pub users: Vec<String>,
    pub total: u64,
}
