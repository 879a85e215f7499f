//! Host adapters
//!
//! Wiring between Rust's own process-wide hooks and the sink registry.

pub mod log_bridge;
