//! Capability enforcement and approval requirements.

use crate::bounded_log::BoundedLog;
use crate::error::NotegateCoreError;
use crate::scope::ScopePattern;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use notegate_config::{AgentConfig, Capability, PermissionsConfig, UnmappedActionPolicy, ZoneRule};
use notegate_protocol::ActionKind;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of a capability check. Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionResult {
    pub allowed: bool,
    pub reason: String,
    pub requires_approval: bool,
}

impl PermissionResult {
    fn allowed(reason: impl Into<String>, requires_approval: bool) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            requires_approval,
        }
    }

    fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            requires_approval: false,
        }
    }
}

/// External policy deciding whether a path needs explicit approval.
pub trait ZoneApprovalPolicy: Send + Sync {
    /// `Some(flag)` when a zone covers `path`, `None` to fall back to the
    /// destructive-action default.
    fn requires_explicit_approval(&self, path: &str) -> Option<bool>;
}

/// Zone policy built from `permissions.zones`; first matching zone wins.
#[derive(Debug, Clone)]
pub struct ConfiguredZonePolicy {
    zones: Vec<(ScopePattern, bool)>,
}

impl ConfiguredZonePolicy {
    pub fn new(zones: &[ZoneRule]) -> Result<Self, NotegateCoreError> {
        let zones = zones
            .iter()
            .map(|zone| Ok((ScopePattern::compile(&zone.pattern)?, zone.require_approval)))
            .collect::<Result<Vec<_>, NotegateCoreError>>()?;
        Ok(Self { zones })
    }
}

impl ZoneApprovalPolicy for ConfiguredZonePolicy {
    fn requires_explicit_approval(&self, path: &str) -> Option<bool> {
        self.zones
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, required)| *required)
    }
}

/// One capability decision, as kept in the access log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessLogEntry {
    pub timestamp: DateTime<Utc>,
    pub agent_name: String,
    pub tool_name: String,
    pub action_kind: ActionKind,
    pub target_path: Option<String>,
    pub allowed: bool,
    pub requires_approval: bool,
    pub reason: String,
}

/// Maps action kinds to required capabilities and decides on approval.
pub struct PermissionAuthority {
    action_capabilities: BTreeMap<ActionKind, Capability>,
    tool_capabilities: BTreeMap<String, Capability>,
    unmapped_action: UnmappedActionPolicy,
    zone_policy: RwLock<Option<Arc<dyn ZoneApprovalPolicy>>>,
    access_log: Mutex<BoundedLog<AccessLogEntry>>,
}

impl PermissionAuthority {
    /// Build from config; configured zones become the initial zone policy.
    pub fn new(config: &PermissionsConfig) -> Result<Self, NotegateCoreError> {
        let zone_policy: Option<Arc<dyn ZoneApprovalPolicy>> = if config.zones.is_empty() {
            None
        } else {
            Some(Arc::new(ConfiguredZonePolicy::new(&config.zones)?))
        };
        Ok(Self {
            action_capabilities: config.action_capabilities.clone(),
            tool_capabilities: config.tool_capabilities.clone(),
            unmapped_action: config.unmapped_action,
            zone_policy: RwLock::new(zone_policy),
            access_log: Mutex::new(BoundedLog::new(config.access_log_cap)),
        })
    }

    /// Replace (or remove) the zone approval policy.
    pub fn set_zone_policy(&self, policy: Option<Arc<dyn ZoneApprovalPolicy>>) {
        *self.zone_policy.write() = policy;
    }

    /// Capability a call needs: the per-tool override, else the action kind's.
    pub fn required_capability(&self, tool_name: &str, kind: ActionKind) -> Option<Capability> {
        self.tool_capabilities
            .get(tool_name)
            .or_else(|| self.action_capabilities.get(&kind))
            .copied()
    }

    /// Check `agent` may perform `kind` through `tool_name` on `target`.
    pub fn check_permission(
        &self,
        agent: &AgentConfig,
        tool_name: &str,
        kind: ActionKind,
        target: Option<&str>,
    ) -> PermissionResult {
        let result = self.evaluate(agent, tool_name, kind, target);
        self.record(agent, tool_name, kind, target, &result);
        result
    }

    fn evaluate(
        &self,
        agent: &AgentConfig,
        tool_name: &str,
        kind: ActionKind,
        target: Option<&str>,
    ) -> PermissionResult {
        if agent.capabilities.yolo_mode {
            warn!(
                "yolo mode bypassing capability and approval checks (agent={}, tool={}, action={})",
                agent.name, tool_name, kind
            );
            return PermissionResult::allowed("yolo mode", false);
        }

        let Some(capability) = self.required_capability(tool_name, kind) else {
            return match self.unmapped_action {
                UnmappedActionPolicy::Allow => {
                    warn!(
                        "unmapped action kind allowed (agent={}, tool={}, action={})",
                        agent.name, tool_name, kind
                    );
                    PermissionResult::allowed(
                        format!("no capability mapped for {kind} actions"),
                        self.requires_approval(kind, target),
                    )
                }
                UnmappedActionPolicy::Deny => {
                    warn!(
                        "unmapped action kind denied (agent={}, tool={}, action={})",
                        agent.name, tool_name, kind
                    );
                    PermissionResult::denied(format!(
                        "{tool_name} is not mapped to any capability ({kind} action)"
                    ))
                }
            };
        };

        if !agent.capabilities.has(capability) {
            warn!(
                "capability missing (agent={}, tool={}, capability={})",
                agent.name, tool_name, capability
            );
            return PermissionResult::denied(format!(
                "agent {} lacks the {capability} capability required by {tool_name}",
                agent.name
            ));
        }

        PermissionResult::allowed(
            format!("{capability} granted"),
            self.requires_approval(kind, target),
        )
    }

    fn requires_approval(&self, kind: ActionKind, target: Option<&str>) -> bool {
        let policy = self.zone_policy.read().clone();
        let zoned = match (policy, target) {
            (Some(policy), Some(path)) => policy.requires_explicit_approval(path),
            _ => None,
        };
        zoned.unwrap_or_else(|| kind.is_destructive())
    }

    fn record(
        &self,
        agent: &AgentConfig,
        tool_name: &str,
        kind: ActionKind,
        target: Option<&str>,
        result: &PermissionResult,
    ) {
        let dropped = self.access_log.lock().push(AccessLogEntry {
            timestamp: Utc::now(),
            agent_name: agent.name.clone(),
            tool_name: tool_name.to_string(),
            action_kind: kind,
            target_path: target.map(str::to_string),
            allowed: result.allowed,
            requires_approval: result.requires_approval,
            reason: result.reason.clone(),
        });
        if dropped > 0 {
            debug!("access log truncated (dropped={dropped})");
        }
    }

    /// Snapshot of the access log, oldest first.
    pub fn access_log(&self) -> Vec<AccessLogEntry> {
        self.access_log.lock().to_vec()
    }
}
