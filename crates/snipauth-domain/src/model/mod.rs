//! Value types exchanged with callers and collaborator services.
//!
//! This module contains:
//! - Resource descriptors returned by the resource-metadata service
//! - Execution requests, replies and test verdicts
//! - Engine inputs (rule items, test-case definitions)

mod execution;
mod resource;
mod types;

pub use execution::{ExecutionOutput, ExecutionReply, ExecutionRequest, TestCaseResult};
pub use resource::{ResourceDescriptor, ResourcePage};
pub use types::{AccessibleUsers, RuleInput, TestCaseDefinition};
