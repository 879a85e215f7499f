//! Configuration
//!
//! Severity kinds, rule sets, persisted settings and extension points.

pub mod filters;
pub mod rules;
pub mod settings;
pub mod types;
