//! snipauth-api: HTTP API layer
//!
//! This crate provides the API layer including:
//! - HTTP REST endpoints via Axum
//! - Middleware (correlation ids, request logging, CORS)
//! - Logging setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                snipauth-api                  │
//! ├─────────────────────────────────────────────┤
//! │  http/          - REST endpoints and DTOs   │
//! │  middleware/    - Correlation id, logging   │
//! │  observability/ - Subscriber setup          │
//! └─────────────────────────────────────────────┘
//! ```

pub mod http;
pub mod middleware;
pub mod observability;
