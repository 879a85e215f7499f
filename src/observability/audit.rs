/// Structured audit events for interceptor lifecycle changes
///
/// Every install, re-arm and bypass is emitted as a single JSON line under the
/// `diagsieve::audit` log target, correlated by interceptor id and rule set
/// fingerprint. Individual dispatch decisions are never audited.
use crate::config::rules::RuleSet;
use crate::sink::lifecycle::{BypassReason, LifecyclePhase};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const AUDIT_TARGET: &str = "diagsieve::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    Installed,
    Rearmed,
    Bypassed,
    ArtifactCleared,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub timestamp: DateTime<Utc>,
    pub details: String,
    pub interceptor_id: Option<Uuid>,
    /// Instance replaced by a re-arm
    pub previous_id: Option<Uuid>,
    pub phase: Option<LifecyclePhase>,
    pub rules_fingerprint: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, details: String) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            details,
            interceptor_id: None,
            previous_id: None,
            phase: None,
            rules_fingerprint: None,
        }
    }

    pub fn with_interceptor(mut self, id: Uuid) -> Self {
        self.interceptor_id = Some(id);
        self
    }

    pub fn with_previous(mut self, id: Uuid) -> Self {
        self.previous_id = Some(id);
        self
    }

    pub fn with_phase(mut self, phase: LifecyclePhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_rules(mut self, rules: &RuleSet) -> Self {
        self.rules_fingerprint = Some(rules.fingerprint());
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut entry = serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339(),
            "event_type": self.event_type,
            "details": self.details,
            "process_id": std::process::id(),
        });

        if let Some(id) = self.interceptor_id {
            entry["interceptor_id"] = serde_json::json!(id);
        }
        if let Some(id) = self.previous_id {
            entry["previous_id"] = serde_json::json!(id);
        }
        if let Some(phase) = self.phase {
            entry["phase"] = serde_json::json!(phase);
        }
        if let Some(fingerprint) = &self.rules_fingerprint {
            entry["rules_fingerprint"] = serde_json::json!(fingerprint);
        }
        entry
    }
}

pub fn log_audit_event(event: AuditEvent) {
    let entry = event.to_json();
    match event.event_type {
        AuditEventType::Bypassed => warn!(target: AUDIT_TARGET, "{}", entry),
        AuditEventType::ArtifactCleared => debug!(target: AUDIT_TARGET, "{}", entry),
        AuditEventType::Installed | AuditEventType::Rearmed => {
            info!(target: AUDIT_TARGET, "{}", entry)
        }
    }
}

pub fn installed(id: Uuid, phase: LifecyclePhase, rules: &RuleSet, had_upstream: bool) {
    let event = AuditEvent::new(
        AuditEventType::Installed,
        format!(
            "Interceptor installed: {} prefixes, mask {}, upstream {}",
            rules.prefixes().len(),
            rules.severity_mask(),
            if had_upstream { "captured" } else { "none" }
        ),
    )
    .with_interceptor(id)
    .with_phase(phase)
    .with_rules(rules);

    log_audit_event(event);
}

pub fn rearmed(
    id: Uuid,
    previous: Uuid,
    phase: LifecyclePhase,
    rules: &RuleSet,
    overwritten: bool,
) {
    let details = if overwritten {
        "Interceptor re-armed: sink had been replaced".to_string()
    } else {
        "Interceptor re-armed: sink still owned".to_string()
    };
    let event = AuditEvent::new(AuditEventType::Rearmed, details)
        .with_interceptor(id)
        .with_previous(previous)
        .with_phase(phase)
        .with_rules(rules);

    log_audit_event(event);
}

pub fn bypassed(reason: BypassReason, rules: Option<&RuleSet>) {
    let details = match reason {
        BypassReason::Disabled => "Interceptor not installed: disabled".to_string(),
        BypassReason::Inert => "Interceptor not installed: nothing to suppress".to_string(),
    };
    let event = AuditEvent::new(AuditEventType::Bypassed, details);
    let event = match rules {
        Some(rules) => event.with_rules(rules),
        None => event,
    };

    log_audit_event(event);
}

pub fn artifact_cleared(file: &str, line: u32) {
    log_audit_event(AuditEvent::new(
        AuditEventType::ArtifactCleared,
        format!("Cleared debugger diagnostic from {}:{}", file, line),
    ));
}
