//! Observability
//!
//! Structured audit events for interceptor lifecycle changes.

pub mod audit;
