/// Diagnostic interceptor: swallows diagnostics matching a rule set and
/// forwards the rest to the sink it displaced.
///
/// Dispatch contract:
/// - `true`: the event is handled (suppressed), the host skips default handling
/// - `false`: the upstream sink handled it, or the host should apply defaults
///
/// Reentrancy: a diagnostic raised while this instance is dispatching on the
/// same thread is answered with `false` immediately. The guard lives in a
/// thread-local set keyed by instance id, so concurrent dispatch on other
/// threads is unaffected.
use crate::config::rules::RuleSet;
use crate::config::types::Severity;
use crate::observability::audit;
use crate::sink::lifecycle::LifecyclePhase;
use crate::sink::registry::{DiagnosticSink, SharedSink, SinkRegistry};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

thread_local! {
    static DISPATCHING: RefCell<HashSet<Uuid>> = RefCell::new(HashSet::new());
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterceptorState {
    Uninstalled,
    Installed,
    Dispatching,
}

pub struct Interceptor {
    id: Uuid,
    rules: Arc<RuleSet>,
    upstream: Mutex<Option<SharedSink>>,
    installed: AtomicBool,
}

/// Clears the reentrancy flag on every exit from `dispatch`, unwinding included
struct DispatchGuard(Uuid);

impl DispatchGuard {
    /// `None` when the flag was already set; the flag is cleared in that case
    fn enter(id: Uuid) -> Option<Self> {
        DISPATCHING.with(|active| {
            let mut active = active.borrow_mut();
            if active.remove(&id) {
                None
            } else {
                active.insert(id);
                Some(Self(id))
            }
        })
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        // try_with: the thread-local may already be gone during thread teardown
        let _ = DISPATCHING.try_with(|active| {
            active.borrow_mut().remove(&self.0);
        });
    }
}

impl Interceptor {
    /// Create an interceptor for `rules`.
    ///
    /// Returns `None` when the rules can never suppress anything; there is
    /// nothing worth installing then.
    pub fn new(rules: Arc<RuleSet>) -> Option<Arc<Self>> {
        if rules.is_inert() {
            return None;
        }
        Some(Arc::new(Self::with_rules(rules)))
    }

    fn with_rules(rules: Arc<RuleSet>) -> Self {
        Self {
            id: Uuid::new_v4(),
            rules,
            upstream: Mutex::new(None),
            installed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    pub fn upstream(&self) -> Option<SharedSink> {
        self.lock_upstream().clone()
    }

    fn lock_upstream(&self) -> MutexGuard<'_, Option<SharedSink>> {
        self.upstream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `Installed` while this instance is the one its last install or re-arm
    /// left in place; a redundant re-arm hands that over to the fresh instance.
    pub fn state(&self) -> InterceptorState {
        if self.is_dispatching() {
            InterceptorState::Dispatching
        } else if self.installed.load(Ordering::SeqCst) {
            InterceptorState::Installed
        } else {
            InterceptorState::Uninstalled
        }
    }

    /// Whether a dispatch of this instance is in flight on the current thread
    pub fn is_dispatching(&self) -> bool {
        DISPATCHING.with(|active| active.borrow().contains(&self.id))
    }

    /// Capture the current sink as upstream and become the current sink.
    ///
    /// Calling this twice with nothing in between makes the interceptor its
    /// own upstream; the reentrancy guard turns the resulting self-forward
    /// into a plain `false`.
    ///
    /// The upstream slot stays locked across the swap, so a dispatch on
    /// another thread that already sees this instance waits for the capture
    /// instead of finding no upstream.
    pub fn install(self: &Arc<Self>, registry: &SinkRegistry, phase: LifecyclePhase) {
        let mut upstream = self.lock_upstream();
        let previous = registry.capture_and_replace(Some(self.clone() as SharedSink));
        let had_upstream = previous.is_some();
        *upstream = previous;
        drop(upstream);
        self.installed.store(true, Ordering::SeqCst);

        audit::installed(self.id, phase, &self.rules, had_upstream);
    }

    /// Re-install a fresh instance sharing this rule set.
    ///
    /// The fresh instance captures whatever is current now. If that is still
    /// this instance, nobody overwrote the sink since the last install, and
    /// the fresh instance adopts this instance's upstream so that redundant
    /// re-arms keep the chain length constant.
    pub fn rearm(self: &Arc<Self>, registry: &SinkRegistry, phase: LifecyclePhase) -> Arc<Self> {
        let fresh = Arc::new(Self::with_rules(Arc::clone(&self.rules)));
        let mut upstream = fresh.lock_upstream();
        let previous = registry.capture_and_replace(Some(fresh.clone() as SharedSink));

        let reclaimed = previous
            .as_ref()
            .and_then(|sink| sink.sink_id())
            .is_some_and(|id| id == self.id);
        *upstream = if reclaimed { self.upstream() } else { previous };
        drop(upstream);

        fresh.installed.store(true, Ordering::SeqCst);
        if reclaimed {
            self.installed.store(false, Ordering::SeqCst);
        }

        audit::rearmed(fresh.id, self.id, phase, &self.rules, !reclaimed);
        fresh
    }

    /// Decide one diagnostic: suppress it, or forward it upstream.
    pub fn dispatch(
        &self,
        severity: Severity,
        message: &str,
        origin_file: &str,
        origin_line: u32,
    ) -> bool {
        let Some(_guard) = DispatchGuard::enter(self.id) else {
            return false;
        };

        if self.rules.covers(severity) && self.rules.matching_prefix(origin_file).is_some() {
            return true;
        }

        self.forward(severity, message, origin_file, origin_line)
    }

    /// Hand the event to the upstream sink and return its answer unchanged.
    /// Without an upstream the answer is `false`: apply default handling.
    fn forward(&self, severity: Severity, message: &str, origin_file: &str, origin_line: u32) -> bool {
        match self.upstream() {
            Some(sink) => sink.handle(severity, message, origin_file, origin_line),
            None => false,
        }
    }
}

impl DiagnosticSink for Interceptor {
    fn handle(&self, severity: Severity, message: &str, origin_file: &str, origin_line: u32) -> bool {
        self.dispatch(severity, message, origin_file, origin_line)
    }

    fn sink_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("id", &self.id)
            .field("rules", &self.rules)
            .field("has_upstream", &self.upstream().is_some())
            .field("state", &self.state())
            .finish()
    }
}
