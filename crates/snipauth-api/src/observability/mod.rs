//! Observability infrastructure for snipauth.
//!
//! Structured logging setup. Per-request log lines and correlation ids are
//! produced by the middleware in [`crate::middleware`].

mod logging;

pub use logging::{create_json_layer, init_logging, parse_log_level, LoggingConfig};
