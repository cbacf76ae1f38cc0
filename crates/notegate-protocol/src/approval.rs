//! Approval vocabulary shared with the surface that renders prompts.

use crate::ActionKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action presented to the human operator for a decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovalAction {
    /// Unique approval request id.
    pub request_id: Uuid,
    /// Agent that requested the action.
    pub agent_name: String,
    /// Tool the agent wants to run.
    pub tool_name: String,
    /// Classified action kind.
    pub action_kind: ActionKind,
    /// Normalized target path, if the call names one.
    pub target_path: Option<String>,
    /// Human-readable summary of the action.
    pub description: String,
    /// Leading excerpt of content about to be written, if any.
    pub content_preview: Option<String>,
}

/// Choice made by the human operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Allow this one call.
    Approve,
    /// Allow this call and stop asking for the same tool and target.
    Always,
    /// Decline the call.
    Deny,
}

impl ApprovalDecision {
    pub fn is_approved(self) -> bool {
        !matches!(self, ApprovalDecision::Deny)
    }
}

/// Decision plus the optional free-text reason the human gave.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalResponse {
    pub decision: ApprovalDecision,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ApprovalResponse {
    pub fn approve() -> Self {
        Self {
            decision: ApprovalDecision::Approve,
            reason: None,
        }
    }

    pub fn always() -> Self {
        Self {
            decision: ApprovalDecision::Always,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            decision: ApprovalDecision::Deny,
            reason: Some(reason.into()),
        }
    }

    /// Prompt closed without an explicit choice: a deny with no reason.
    pub fn dismissed() -> Self {
        Self {
            decision: ApprovalDecision::Deny,
            reason: None,
        }
    }
}

/// Outcome recorded in the approval history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalOutcome {
    /// Approved once by the human.
    Approved,
    /// Approved by the human with an always-approve rule installed.
    AlwaysApproved,
    /// Approved without prompting because a rule matched.
    AutoApproved,
    /// Declined by the human, explicitly or by dismissal.
    Denied,
}
