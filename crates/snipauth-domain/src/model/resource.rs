//! Resource descriptors owned by the resource-metadata service.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Metadata for one externally-owned resource (a code snippet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub id: String,
    pub name: String,
    pub author_id: String,
    pub created_at: NaiveDateTime,
    pub content: String,
    pub language: String,
    pub language_version: String,
    pub is_valid: bool,
    /// Analyzer findings, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<serde_json::Value>>,
}

/// One page of a user's resources as reported by the resource service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePage {
    #[serde(alias = "snippets")]
    pub items: Vec<ResourceDescriptor>,
    pub total_pages: u32,
    pub total_elements: u64,
}
