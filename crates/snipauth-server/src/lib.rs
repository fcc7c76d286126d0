//! snipauth-server: configuration and collaborator service clients
//!
//! This crate contains the pieces the binary wires together:
//! - Configuration management (YAML file + env overrides)
//! - reqwest-backed clients for the resource and execution services
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               snipauth-server               │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration management     │
//! │  clients.rs  - Outbound HTTP clients        │
//! │    HttpResourceClient  - snippet metadata   │
//! │    HttpExecutionClient - snippet runner     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod clients;
pub mod config;

// Re-exports for convenience
pub use clients::{HttpExecutionClient, HttpResourceClient};
pub use config::{ConfigLoadError, ServerConfig};
