/// Process-wide diagnostic sink slot
///
/// The host delivers every diagnostic to whatever sink is current. Any code
/// may replace the current sink, which is why interceptors capture the
/// previous one and re-assert ownership at lifecycle checkpoints.
use crate::config::types::Severity;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// A handler for diagnostic events.
///
/// Returns `true` when the event is fully handled and the host must skip
/// its default handling.
pub trait DiagnosticSink: Send + Sync {
    fn handle(&self, severity: Severity, message: &str, origin_file: &str, origin_line: u32) -> bool;

    /// Identity of an interceptor sink; plain sinks have none
    fn sink_id(&self) -> Option<Uuid> {
        None
    }
}

impl<F> DiagnosticSink for F
where
    F: Fn(Severity, &str, &str, u32) -> bool + Send + Sync,
{
    fn handle(&self, severity: Severity, message: &str, origin_file: &str, origin_line: u32) -> bool {
        self(severity, message, origin_file, origin_line)
    }
}

pub type SharedSink = Arc<dyn DiagnosticSink>;

/// A diagnostic the host handled itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: u32,
}

#[derive(Default)]
pub struct SinkRegistry {
    current: Mutex<Option<SharedSink>>,
    last_event: Mutex<Option<Diagnostic>>,
}

static GLOBAL_REGISTRY: Lazy<SinkRegistry> = Lazy::new(SinkRegistry::new);

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry the host process delivers diagnostics through
    pub fn global() -> &'static SinkRegistry {
        &GLOBAL_REGISTRY
    }

    /// Make `sink` current and hand back whatever was current before.
    ///
    /// This is the only way the current sink changes.
    pub fn capture_and_replace(&self, sink: Option<SharedSink>) -> Option<SharedSink> {
        std::mem::replace(&mut *lock(&self.current), sink)
    }

    pub fn current(&self) -> Option<SharedSink> {
        lock(&self.current).clone()
    }

    /// Whether the current sink is the interceptor with identity `id`
    pub fn is_current(&self, id: Uuid) -> bool {
        self.current()
            .and_then(|sink| sink.sink_id())
            .is_some_and(|current| current == id)
    }

    /// Deliver a diagnostic the way the host runtime does.
    ///
    /// The current sink is cloned out of the slot before it runs, so a sink
    /// may raise further diagnostics or replace the current sink. When no
    /// sink handles the event the host records it as the last diagnostic.
    pub fn raise(&self, severity: Severity, message: &str, file: &str, line: u32) -> bool {
        let handled = match self.current() {
            Some(sink) => sink.handle(severity, message, file, line),
            None => false,
        };

        if !handled {
            *lock(&self.last_event) = Some(Diagnostic {
                severity,
                message: message.to_string(),
                file: file.to_string(),
                line,
            });
        }
        handled
    }

    pub fn last_event(&self) -> Option<Diagnostic> {
        lock(&self.last_event).clone()
    }

    pub fn clear_last_event(&self) -> Option<Diagnostic> {
        lock(&self.last_event).take()
    }
}

impl std::fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("has_sink", &self.current().is_some())
            .field("last_event", &self.last_event())
            .finish()
    }
}

/// Poisoning only means a sink panicked mid-delivery; the slot itself is
/// still a valid value.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_registry_applies_default_handling() {
        let registry = SinkRegistry::new();
        assert!(registry.current().is_none());

        assert!(!registry.raise(Severity::Warning, "w", "/a.php", 3));
        let last = registry.last_event().unwrap();
        assert_eq!(last.file, "/a.php");
        assert_eq!(last.line, 3);
        assert_eq!(last.severity, Severity::Warning);
    }

    #[test]
    fn test_capture_and_replace_returns_previous() {
        let registry = SinkRegistry::new();
        let first: SharedSink = Arc::new(|_: Severity, _: &str, _: &str, _: u32| true);
        let second: SharedSink = Arc::new(|_: Severity, _: &str, _: &str, _: u32| false);

        assert!(registry.capture_and_replace(Some(first.clone())).is_none());
        let previous = registry.capture_and_replace(Some(second)).unwrap();
        assert!(Arc::ptr_eq(&previous, &first));

        let cleared = registry.capture_and_replace(None);
        assert!(cleared.is_some());
        assert!(registry.current().is_none());
    }

    #[test]
    fn test_handled_events_are_not_recorded() {
        let registry = SinkRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        registry.capture_and_replace(Some(Arc::new(
            move |_: Severity, _: &str, _: &str, _: u32| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            },
        )));

        assert!(registry.raise(Severity::Notice, "n", "/b.php", 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.last_event().is_none());
    }

    #[test]
    fn test_sink_may_replace_current_while_running() {
        let registry = Arc::new(SinkRegistry::new());
        let inner = registry.clone();
        registry.capture_and_replace(Some(Arc::new(
            move |_: Severity, _: &str, _: &str, _: u32| {
                inner.capture_and_replace(None);
                true
            },
        )));

        assert!(registry.raise(Severity::Notice, "n", "/b.php", 1));
        assert!(registry.current().is_none());
    }

    #[test]
    fn test_clear_last_event() {
        let registry = SinkRegistry::new();
        registry.raise(Severity::Notice, "n", "/b.php", 1);
        assert!(registry.clear_last_event().is_some());
        assert!(registry.last_event().is_none());
    }

    #[test]
    fn test_plain_sinks_have_no_identity() {
        let registry = SinkRegistry::new();
        registry.capture_and_replace(Some(Arc::new(
            |_: Severity, _: &str, _: &str, _: u32| true,
        )));
        assert!(!registry.is_current(Uuid::new_v4()));
    }
}
