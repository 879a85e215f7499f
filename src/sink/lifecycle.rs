/// Lifecycle orchestration: bootstrap the interceptor and re-assert sink
/// ownership at the checkpoints where other code is known to clobber it.
///
/// Two independent re-arm triggers exist and stay separate:
/// - every recurring task checkpoint (the task runner resets sinks per cycle)
/// - a module finishing its load, when that module is on the allow-list of
///   modules that overwrite the sink unconditionally
use crate::config::filters::Extensions;
use crate::config::settings::Settings;
use crate::observability::audit;
use crate::sink::artifacts::clear_debugger_artifact;
use crate::sink::interceptor::Interceptor;
use crate::sink::registry::SinkRegistry;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Modules that replace the process sink whenever they finish loading
pub const DISRUPTIVE_MODULES: &[&str] = &[
    "backwpup/backwpup.php",
    "query-monitor/query-monitor.php",
];

/// Phase in which an install or re-arm happens, decided by the orchestrator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    EarlyBoot,
    RecurringTask,
    ModuleLoaded,
    RenderCheckpoint,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecyclePhase::EarlyBoot => "early_boot",
            LifecyclePhase::RecurringTask => "recurring_task",
            LifecyclePhase::ModuleLoaded => "module_loaded",
            LifecyclePhase::RenderCheckpoint => "render_checkpoint",
        };
        f.write_str(name)
    }
}

/// Signal delivered by the host lifecycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleSignal {
    RecurringTask,
    ModuleLoaded(String),
    RenderCheckpoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalOutcome {
    Rearmed,
    ArtifactCleared,
    Ignored,
    /// Nothing installed, or the disable switch is set
    Bypassed,
}

/// Why bootstrap installed nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    Disabled,
    Inert,
}

pub fn is_disruptive_module(module: &str) -> bool {
    DISRUPTIVE_MODULES.contains(&module)
}

pub struct Lifecycle<'r> {
    registry: &'r SinkRegistry,
    interceptor: Option<Arc<Interceptor>>,
    bypass: Option<BypassReason>,
}

impl<'r> Lifecycle<'r> {
    /// Build the rule set and install the interceptor at early boot.
    ///
    /// Nothing is installed when the disable switch is set or when the rule
    /// set can never suppress anything.
    pub fn bootstrap(
        registry: &'r SinkRegistry,
        settings: &Settings,
        extensions: &Extensions,
    ) -> Self {
        if settings.disabled {
            audit::bypassed(BypassReason::Disabled, None);
            return Self::bypassed(registry, BypassReason::Disabled);
        }

        let rules = Arc::new(extensions.build_rules(settings));
        let Some(interceptor) = Interceptor::new(Arc::clone(&rules)) else {
            audit::bypassed(BypassReason::Inert, Some(&rules));
            return Self::bypassed(registry, BypassReason::Inert);
        };

        interceptor.install(registry, LifecyclePhase::EarlyBoot);
        Self {
            registry,
            interceptor: Some(interceptor),
            bypass: None,
        }
    }

    fn bypassed(registry: &'r SinkRegistry, reason: BypassReason) -> Self {
        Self {
            registry,
            interceptor: None,
            bypass: Some(reason),
        }
    }

    pub fn registry(&self) -> &'r SinkRegistry {
        self.registry
    }

    /// The most recently installed interceptor
    pub fn interceptor(&self) -> Option<&Arc<Interceptor>> {
        self.interceptor.as_ref()
    }

    pub fn bypass_reason(&self) -> Option<BypassReason> {
        self.bypass
    }

    pub fn is_active(&self) -> bool {
        self.interceptor.is_some()
    }

    /// Re-install a fresh interceptor. Returns `false` when bypassed.
    pub fn rearm(&mut self, phase: LifecyclePhase) -> bool {
        match self.interceptor.take() {
            Some(current) => {
                self.interceptor = Some(current.rearm(self.registry, phase));
                true
            }
            None => false,
        }
    }

    /// React to one host lifecycle signal.
    ///
    /// The render checkpoint cleanup does not depend on an installed
    /// interceptor and only the disable switch turns it off.
    pub fn handle(&mut self, signal: LifecycleSignal) -> SignalOutcome {
        if self.bypass == Some(BypassReason::Disabled) {
            return SignalOutcome::Bypassed;
        }

        match signal {
            LifecycleSignal::RenderCheckpoint => {
                if clear_debugger_artifact(self.registry) {
                    SignalOutcome::ArtifactCleared
                } else {
                    SignalOutcome::Ignored
                }
            }
            _ if !self.is_active() => SignalOutcome::Bypassed,
            LifecycleSignal::RecurringTask => {
                self.rearm(LifecyclePhase::RecurringTask);
                SignalOutcome::Rearmed
            }
            LifecycleSignal::ModuleLoaded(module) if is_disruptive_module(&module) => {
                debug!("Module {} replaces the diagnostic sink on load, re-arming", module);
                self.rearm(LifecyclePhase::ModuleLoaded);
                SignalOutcome::Rearmed
            }
            LifecycleSignal::ModuleLoaded(_) => SignalOutcome::Ignored,
        }
    }
}

impl fmt::Debug for Lifecycle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("interceptor", &self.interceptor.as_ref().map(|i| i.id()))
            .field("bypass", &self.bypass)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{Severity, SeverityMask};

    fn settings() -> Settings {
        Settings::with_dirs(["wp-admin/", "/vendor/acme/"])
    }

    #[test]
    fn test_bootstrap_installs_at_early_boot() {
        let registry = SinkRegistry::new();
        let lifecycle = Lifecycle::bootstrap(&registry, &settings(), &Extensions::new());

        let interceptor = lifecycle.interceptor().unwrap();
        assert!(registry.is_current(interceptor.id()));
        assert!(lifecycle.bypass_reason().is_none());
    }

    #[test]
    fn test_disable_switch_bypasses() {
        let registry = SinkRegistry::new();
        let mut disabled = settings();
        disabled.disabled = true;

        let mut lifecycle = Lifecycle::bootstrap(&registry, &disabled, &Extensions::new());
        assert!(!lifecycle.is_active());
        assert_eq!(lifecycle.bypass_reason(), Some(BypassReason::Disabled));
        assert!(registry.current().is_none());
        assert_eq!(
            lifecycle.handle(LifecycleSignal::RecurringTask),
            SignalOutcome::Bypassed
        );

        registry.raise(Severity::Notice, "eval", "xdebug://debug-eval", 1);
        assert_eq!(
            lifecycle.handle(LifecycleSignal::RenderCheckpoint),
            SignalOutcome::Bypassed
        );
        assert!(registry.last_event().is_some());
    }

    #[test]
    fn test_inert_rules_bypass() {
        let registry = SinkRegistry::new();
        let extensions = Extensions::new().filter_levels(|_| SeverityMask::empty());

        let mut lifecycle = Lifecycle::bootstrap(&registry, &settings(), &extensions);
        assert_eq!(lifecycle.bypass_reason(), Some(BypassReason::Inert));
        assert!(registry.current().is_none());
        assert_eq!(
            lifecycle.handle(LifecycleSignal::RecurringTask),
            SignalOutcome::Bypassed
        );
    }

    #[test]
    fn test_render_checkpoint_runs_with_inert_rules() {
        let registry = SinkRegistry::new();
        let mut lifecycle =
            Lifecycle::bootstrap(&registry, &Settings::default(), &Extensions::new());
        assert_eq!(lifecycle.bypass_reason(), Some(BypassReason::Inert));

        registry.raise(Severity::Warning, "eval", "xdebug://debug-eval", 1);
        assert_eq!(
            lifecycle.handle(LifecycleSignal::RenderCheckpoint),
            SignalOutcome::ArtifactCleared
        );
        assert!(registry.last_event().is_none());
    }

    #[test]
    fn test_recurring_task_rearms() {
        let registry = SinkRegistry::new();
        let mut lifecycle = Lifecycle::bootstrap(&registry, &settings(), &Extensions::new());
        let first = lifecycle.interceptor().unwrap().id();

        assert_eq!(
            lifecycle.handle(LifecycleSignal::RecurringTask),
            SignalOutcome::Rearmed
        );
        let second = lifecycle.interceptor().unwrap().id();
        assert_ne!(first, second);
        assert!(registry.is_current(second));
    }

    #[test]
    fn test_module_loaded_rearms_only_allow_listed() {
        let registry = SinkRegistry::new();
        let mut lifecycle = Lifecycle::bootstrap(&registry, &settings(), &Extensions::new());
        let first = lifecycle.interceptor().unwrap().id();

        assert_eq!(
            lifecycle.handle(LifecycleSignal::ModuleLoaded("hello-dolly/hello.php".into())),
            SignalOutcome::Ignored
        );
        assert_eq!(lifecycle.interceptor().unwrap().id(), first);

        assert_eq!(
            lifecycle.handle(LifecycleSignal::ModuleLoaded("backwpup/backwpup.php".into())),
            SignalOutcome::Rearmed
        );
        assert_ne!(lifecycle.interceptor().unwrap().id(), first);
    }

    #[test]
    fn test_render_checkpoint_clears_debugger_artifact() {
        let registry = SinkRegistry::new();
        let mut lifecycle = Lifecycle::bootstrap(&registry, &settings(), &Extensions::new());

        registry.raise(Severity::Error, "eval failed", "xdebug://debug-eval", 1);
        assert_eq!(
            lifecycle.handle(LifecycleSignal::RenderCheckpoint),
            SignalOutcome::ArtifactCleared
        );
        assert_eq!(
            lifecycle.handle(LifecycleSignal::RenderCheckpoint),
            SignalOutcome::Ignored
        );
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(LifecyclePhase::ModuleLoaded.to_string(), "module_loaded");
    }
}
