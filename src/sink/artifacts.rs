use crate::observability::audit;
use crate::sink::registry::SinkRegistry;

/// Pseudo-file the step debugger reports for code evaluated in its console
pub const DEBUGGER_PSEUDO_FILE: &str = "xdebug://debug-eval";

/// Forget the host's last recorded diagnostic when it came from the debugger
/// console rather than real source. Returns whether anything was cleared.
pub fn clear_debugger_artifact(registry: &SinkRegistry) -> bool {
    let from_debugger = registry
        .last_event()
        .is_some_and(|event| event.file.starts_with(DEBUGGER_PSEUDO_FILE));

    if !from_debugger {
        return false;
    }

    if let Some(event) = registry.clear_last_event() {
        audit::artifact_cleared(&event.file, event.line);
    }
    true
}
