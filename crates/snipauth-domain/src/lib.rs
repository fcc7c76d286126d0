//! snipauth-domain: authorization and orchestration core
//!
//! This crate contains the engines that sit between the HTTP surface and
//! the store:
//! - Permission grants, ownership checks and sharing
//! - Per-user FORMAT / LINT rule sets
//! - Test-case storage and remote execution
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               snipauth-domain               │
//! ├─────────────────────────────────────────────┤
//! │  authorization - Grants & sharing           │
//! │  rules         - Rule batch upsert          │
//! │  testcase      - Test-case runs             │
//! │  clients       - Collaborator service seams │
//! │  model/        - Payloads & engine inputs   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod authorization;
pub mod clients;
pub mod error;
pub mod model;
pub mod rules;
pub mod testcase;

#[cfg(test)]
mod tests;

// Re-export commonly used types at the crate root
pub use authorization::AuthorizationEngine;
pub use clients::{ClientError, ClientResult, ExecutionClient, ResourceClient};
pub use error::{DomainError, DomainResult};
pub use rules::RuleEngine;
pub use testcase::{TestCaseEngine, TEST_FAILED, TEST_PASSED};
