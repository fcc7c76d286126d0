//! snipauth-storage: Storage abstraction layer
//!
//! This crate provides the persisted records and store traits for the
//! permission service:
//! - `GrantStore` for (user, resource) permission grants
//! - `RuleStore` for per-user formatting and linting rules
//! - `TestCaseStore` for test-case definitions
//! - In-memory implementation of all three
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              snipauth-storage                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - Records and store traits     │
//! │  memory.rs   - In-memory implementation     │
//! │  error.rs    - StorageError                 │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryDataStore;
pub use traits::{
    validate_identifier, DataStore, Grant, GrantStore, Page, PageRequest, PermissionKind, Rule,
    RuleStore, RuleType, TestCase, TestCaseStore, MAX_IDENTIFIER_LENGTH,
};

// Re-export chrono types used in public records
pub use chrono::{DateTime, Utc};
