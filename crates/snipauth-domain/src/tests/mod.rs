//! Tests for the domain engines.
//!
//! Organized by engine:
//! - Grants, sharing and the friends view
//! - Rule upsert and delete
//! - Test-case storage and execution
//! - Property-based checks on grant growth and upsert idempotence
