//! Human-in-the-loop approval workflow.
//!
//! The coordinator owns the always-approved rules and the approval history.
//! Rendering the prompt belongs to an [`ApprovalSurface`]; the coordinator
//! only waits for its answer. There is no timeout: a prompt stays open until
//! the human decides or dismisses it.

use crate::bounded_log::BoundedLog;
use crate::decision_cache::{DecisionCache, DecisionKey, TargetKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use notegate_config::ApprovalsConfig;
use notegate_protocol::{
    ActionKind, ApprovalAction, ApprovalDecision, ApprovalOutcome, ApprovalResponse,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Whatever renders approval prompts to the human operator.
#[async_trait]
pub trait ApprovalSurface: Send + Sync {
    /// Present `action` and resolve once the human answers.
    async fn present(&self, action: ApprovalAction) -> ApprovalResponse;
}

/// One entry of the approval history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub agent_name: String,
    pub tool_name: String,
    pub action_kind: ActionKind,
    pub target_path: Option<String>,
    pub description: String,
    pub outcome: ApprovalOutcome,
    pub reason: Option<String>,
}

/// Coordinates approval prompts, always-approved rules and history.
pub struct ApprovalCoordinator {
    surface: RwLock<Option<Arc<dyn ApprovalSurface>>>,
    always_approved: Mutex<DecisionCache>,
    history: Mutex<BoundedLog<ApprovalHistoryEntry>>,
}

impl ApprovalCoordinator {
    pub fn new(config: &ApprovalsConfig) -> Self {
        Self {
            surface: RwLock::new(None),
            always_approved: Mutex::new(DecisionCache::new()),
            history: Mutex::new(BoundedLog::new(config.history_cap)),
        }
    }

    /// Attach (or detach) the surface prompts are rendered on.
    pub fn set_surface(&self, surface: Option<Arc<dyn ApprovalSurface>>) {
        *self.surface.write() = surface;
    }

    /// Auto-approve from a matching rule, otherwise ask the human.
    ///
    /// `Always` installs a rule keyed by the action's tool and target before
    /// returning. Without a surface the request counts as dismissed.
    pub async fn request_approval(&self, action: ApprovalAction) -> ApprovalResponse {
        if self.is_always_approved(
            &action.agent_name,
            &action.tool_name,
            action.target_path.as_deref(),
        ) {
            debug!(
                "auto-approved by rule (agent={}, tool={}, target={:?})",
                action.agent_name, action.tool_name, action.target_path
            );
            self.record(&action, ApprovalOutcome::AutoApproved, None);
            return ApprovalResponse::approve();
        }

        let surface = self.surface.read().clone();
        let response = match surface {
            Some(surface) => surface.present(action.clone()).await,
            None => {
                warn!(
                    "approval requested without a surface; treating as dismissed (agent={}, tool={})",
                    action.agent_name, action.tool_name
                );
                ApprovalResponse::deny("no approval surface is available to ask the user")
            }
        };

        let outcome = match response.decision {
            ApprovalDecision::Approve => ApprovalOutcome::Approved,
            ApprovalDecision::Always => {
                self.add_to_always_approved(
                    &action.agent_name,
                    &action.tool_name,
                    TargetKey::from_target(action.target_path.as_deref()),
                );
                ApprovalOutcome::AlwaysApproved
            }
            ApprovalDecision::Deny => ApprovalOutcome::Denied,
        };
        self.record(&action, outcome, response.reason.clone());
        response
    }

    /// Whether a rule covers `(agent, tool, target)`: exact key first, then
    /// the `(agent, tool, *)` wildcard.
    pub fn is_always_approved(&self, agent_name: &str, tool_name: &str, target: Option<&str>) -> bool {
        let key = DecisionKey::new(agent_name, tool_name, TargetKey::from_target(target));
        self.always_approved.lock().covers(&key)
    }

    pub fn add_to_always_approved(&self, agent_name: &str, tool_name: &str, target: TargetKey) {
        info!(
            "always-approved rule installed (agent={}, tool={}, target={})",
            agent_name, tool_name, target
        );
        self.always_approved
            .lock()
            .insert(DecisionKey::new(agent_name, tool_name, target));
    }

    pub fn remove_always_approved(&self, agent_name: &str, tool_name: &str, target: TargetKey) -> bool {
        self.always_approved
            .lock()
            .remove(&DecisionKey::new(agent_name, tool_name, target))
    }

    pub fn clear_always_approved(&self) {
        let mut rules = self.always_approved.lock();
        info!("always-approved rules cleared (count={})", rules.len());
        rules.clear();
    }

    /// Installed rules, sorted.
    pub fn always_approved_rules(&self) -> Vec<DecisionKey> {
        self.always_approved.lock().keys()
    }

    /// Approval history, oldest first.
    pub fn history(&self) -> Vec<ApprovalHistoryEntry> {
        self.history.lock().to_vec()
    }

    fn record(&self, action: &ApprovalAction, outcome: ApprovalOutcome, reason: Option<String>) {
        let dropped = self.history.lock().push(ApprovalHistoryEntry {
            timestamp: Utc::now(),
            agent_name: action.agent_name.clone(),
            tool_name: action.tool_name.clone(),
            action_kind: action.action_kind,
            target_path: action.target_path.clone(),
            description: action.description.clone(),
            outcome,
            reason,
        });
        if dropped > 0 {
            debug!("approval history truncated (dropped={dropped})");
        }
    }
}

/// Pending approval stored while waiting for a decision.
#[derive(Debug)]
struct PendingApproval {
    sender: oneshot::Sender<ApprovalResponse>,
    action: ApprovalAction,
}

/// Approval surface resolved by id from elsewhere, typically a UI.
///
/// Each presented action parks until [`PendingApprovals::resolve`] or
/// [`PendingApprovals::dismiss`] is called with its request id. Dismissal
/// resolves as a deny with no reason.
#[derive(Default)]
pub struct PendingApprovals {
    pending: Mutex<HashMap<Uuid, PendingApproval>>,
    notifier: Option<mpsc::UnboundedSender<ApprovalAction>>,
}

impl PendingApprovals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface plus a receiver that yields every newly parked action.
    pub fn with_notifier() -> (Self, mpsc::UnboundedReceiver<ApprovalAction>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                pending: Mutex::new(HashMap::new()),
                notifier: Some(sender),
            },
            receiver,
        )
    }

    /// Resolve a pending approval by request id.
    ///
    /// Returns `false` when the id is unknown or the waiting call is gone.
    pub fn resolve(&self, request_id: Uuid, response: ApprovalResponse) -> bool {
        let Some(pending) = self.pending.lock().remove(&request_id) else {
            return false;
        };
        let decision = response.decision;
        let delivered = pending.sender.send(response).is_ok();
        if delivered {
            info!("approval resolved (request_id={request_id}, decision={decision:?})");
        } else {
            warn!("approval resolved after the caller left (request_id={request_id})");
        }
        delivered
    }

    /// Close a prompt without a decision.
    pub fn dismiss(&self, request_id: Uuid) -> bool {
        let removed = self.pending.lock().remove(&request_id).is_some();
        if removed {
            info!("approval dismissed (request_id={request_id})");
        }
        removed
    }

    /// Actions currently waiting for a decision.
    pub fn list_pending(&self) -> Vec<ApprovalAction> {
        self.pending
            .lock()
            .values()
            .map(|pending| pending.action.clone())
            .collect()
    }
}

/// Removes a parked prompt if the presenting call is dropped before a decision.
struct ParkedPrompt<'a> {
    pending: &'a Mutex<HashMap<Uuid, PendingApproval>>,
    request_id: Uuid,
}

impl Drop for ParkedPrompt<'_> {
    fn drop(&mut self) {
        if self.pending.lock().remove(&self.request_id).is_some() {
            debug!("approval prompt abandoned (request_id={})", self.request_id);
        }
    }
}

#[async_trait]
impl ApprovalSurface for PendingApprovals {
    async fn present(&self, action: ApprovalAction) -> ApprovalResponse {
        let (sender, receiver) = oneshot::channel();
        let request_id = action.request_id;
        self.pending.lock().insert(
            request_id,
            PendingApproval {
                sender,
                action: action.clone(),
            },
        );
        let _parked = ParkedPrompt {
            pending: &self.pending,
            request_id,
        };
        if let Some(notifier) = &self.notifier
            && notifier.send(action).is_err()
        {
            debug!("approval notifier closed (request_id={request_id})");
        }
        receiver.await.unwrap_or_else(|_| ApprovalResponse::dismissed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FixedSurface(ApprovalResponse);

    #[async_trait]
    impl ApprovalSurface for FixedSurface {
        async fn present(&self, _action: ApprovalAction) -> ApprovalResponse {
            self.0.clone()
        }
    }

    fn action(tool: &str, target: Option<&str>) -> ApprovalAction {
        ApprovalAction {
            request_id: Uuid::new_v4(),
            agent_name: "scribe".to_string(),
            tool_name: tool.to_string(),
            action_kind: ActionKind::Write,
            target_path: target.map(str::to_string),
            description: format!("scribe wants to run {tool}"),
            content_preview: None,
        }
    }

    fn coordinator(response: ApprovalResponse) -> ApprovalCoordinator {
        let coordinator = ApprovalCoordinator::new(&ApprovalsConfig::default());
        coordinator.set_surface(Some(Arc::new(FixedSurface(response))));
        coordinator
    }

    #[tokio::test]
    async fn always_installs_rule_for_tool_and_target() {
        let coordinator = coordinator(ApprovalResponse::always());

        let response = coordinator.request_approval(action("write_note", Some("a.md"))).await;
        assert_eq!(response.decision, ApprovalDecision::Always);
        assert!(coordinator.is_always_approved("scribe", "write_note", Some("a.md")));
        assert!(!coordinator.is_always_approved("scribe", "write_note", Some("b.md")));

        coordinator.set_surface(Some(Arc::new(FixedSurface(ApprovalResponse::deny("no")))));
        let response = coordinator.request_approval(action("write_note", Some("a.md"))).await;
        assert_eq!(response.decision, ApprovalDecision::Approve);

        let outcomes: Vec<ApprovalOutcome> = coordinator
            .history()
            .iter()
            .map(|entry| entry.outcome)
            .collect();
        assert_eq!(
            outcomes,
            vec![ApprovalOutcome::AlwaysApproved, ApprovalOutcome::AutoApproved]
        );
    }

    #[tokio::test]
    async fn missing_surface_is_a_denial() {
        let coordinator = ApprovalCoordinator::new(&ApprovalsConfig::default());
        let response = coordinator.request_approval(action("delete_note", None)).await;
        assert_eq!(response.decision, ApprovalDecision::Deny);
        assert_eq!(coordinator.history()[0].outcome, ApprovalOutcome::Denied);
    }

    #[tokio::test]
    async fn rules_can_be_removed_and_cleared() {
        let coordinator = ApprovalCoordinator::new(&ApprovalsConfig::default());
        coordinator.add_to_always_approved("scribe", "write_note", TargetKey::Wildcard);
        coordinator.add_to_always_approved("scribe", "delete_note", TargetKey::Path("a.md".into()));
        assert_eq!(coordinator.always_approved_rules().len(), 2);

        assert!(coordinator.remove_always_approved("scribe", "write_note", TargetKey::Wildcard));
        assert!(!coordinator.is_always_approved("scribe", "write_note", Some("x.md")));

        coordinator.clear_always_approved();
        assert!(coordinator.always_approved_rules().is_empty());
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let coordinator = ApprovalCoordinator::new(&ApprovalsConfig { history_cap: 2 });
        coordinator.set_surface(Some(Arc::new(FixedSurface(ApprovalResponse::approve()))));
        for idx in 0..3 {
            let target = format!("{idx}.md");
            coordinator
                .request_approval(action("write_note", Some(&target)))
                .await;
        }
        let history = coordinator.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].target_path.as_deref(), Some("2.md"));
    }

    #[tokio::test]
    async fn pending_approvals_resolve_by_id() {
        let (surface, mut parked) = PendingApprovals::with_notifier();
        let surface = Arc::new(surface);
        let presenter = surface.clone();
        let task = tokio::spawn(async move { presenter.present(action("write_note", Some("a.md"))).await });

        let parked_action = parked.recv().await.expect("parked action");
        assert_eq!(surface.list_pending().len(), 1);
        assert!(surface.resolve(parked_action.request_id, ApprovalResponse::deny("later")));
        assert!(!surface.resolve(parked_action.request_id, ApprovalResponse::approve()));

        let response = task.await.expect("join");
        assert_eq!(response, ApprovalResponse::deny("later"));
        assert!(surface.list_pending().is_empty());
    }

    #[tokio::test]
    async fn dismissed_pending_approval_denies_without_reason() {
        let (surface, mut parked) = PendingApprovals::with_notifier();
        let surface = Arc::new(surface);
        let presenter = surface.clone();
        let task = tokio::spawn(async move { presenter.present(action("delete_note", None)).await });

        let parked_action = parked.recv().await.expect("parked action");
        assert!(surface.dismiss(parked_action.request_id));

        let response = task.await.expect("join");
        assert_eq!(response, ApprovalResponse::dismissed());
    }

    #[tokio::test]
    async fn abandoned_prompt_leaves_nothing_pending() {
        let (surface, mut parked) = PendingApprovals::with_notifier();
        let surface = Arc::new(surface);
        let presenter = surface.clone();
        let task = tokio::spawn(async move { presenter.present(action("write_note", None)).await });

        let parked_action = parked.recv().await.expect("parked action");
        task.abort();
        assert!(task.await.expect_err("aborted").is_cancelled());

        assert!(surface.list_pending().is_empty());
        assert!(!surface.resolve(parked_action.request_id, ApprovalResponse::approve()));
    }
}
