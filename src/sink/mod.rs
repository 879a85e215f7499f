//! Diagnostic sink chain
//!
//! The process-wide sink slot, the interceptor that wraps it, and the
//! lifecycle hooks that keep the interceptor installed.

pub mod artifacts;
pub mod interceptor;
pub mod lifecycle;
pub mod registry;
