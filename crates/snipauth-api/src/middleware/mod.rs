//! API middleware.
//!
//! Includes:
//! - Correlation id assignment
//! - Request logging
//! - CORS configuration

mod correlation_id;
mod logging;

pub use correlation_id::{CorrelationId, CorrelationIdLayer, CORRELATION_ID_HEADER};
pub use logging::RequestLoggingLayer;

use tower_http::cors::{Any, CorsLayer};

/// Creates a CORS layer with permissive settings.
///
/// The platform's front end is served from another origin.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}
