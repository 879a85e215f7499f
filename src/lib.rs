//! diagsieve: chained diagnostic sink with path-based suppression
//!
//! A host runtime delivers every diagnostic (error, warning, notice) to one
//! process-wide sink. diagsieve installs an interceptor in that slot that
//! swallows diagnostics of selected severities raised from selected paths and
//! forwards everything else to the sink it displaced.
//!
//! # Architecture
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: Severity kinds, severity masks, error type
//! - [`config::rules`]: Path normalization and the immutable rule set
//! - [`config::settings`]: JSON settings store and the built-in directory list
//! - [`config::filters`]: "filter dirs" / "filter levels" extension points
//!
//! ## Sink Chain ([`sink`])
//! - [`sink::registry`]: The process-wide sink slot and host delivery path
//! - [`sink::interceptor`]: Install, dispatch and re-arm with a reentrancy guard
//! - [`sink::lifecycle`]: Bootstrap and re-arm checkpoints
//! - [`sink::artifacts`]: Debugger pseudo-file cleanup
//!
//! ## Host Adapters ([`host`])
//! - [`host::log_bridge`]: Routes `log` records through a sink registry
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: Structured lifecycle audit events
//!
//! # Invariants
//!
//! 1. **Forward by default** - anything not both in the mask and under a
//!    prefix reaches the upstream sink with its answer intact
//! 2. **Guard always clears** - every exit from dispatch, unwinding included,
//!    resets the reentrancy flag
//! 3. **Rules are immutable** - re-arming builds a fresh instance over the
//!    same shared rule set

// Configuration
pub mod config;

// Sink Chain
pub mod sink;

// Host Adapters
pub mod host;

// Observability
pub mod observability;

// CLI entrypoint for the diagsieve binary
pub mod cli;

pub use config::filters::Extensions;
pub use config::rules::{normalize_path, normalize_prefix, RuleSet};
pub use config::settings::{Settings, SiteLayout};
pub use config::types::{Result, Severity, SeverityMask, SieveError};
pub use sink::interceptor::{Interceptor, InterceptorState};
pub use sink::lifecycle::{Lifecycle, LifecyclePhase, LifecycleSignal, SignalOutcome};
pub use sink::registry::{DiagnosticSink, SharedSink, SinkRegistry};
