//! Tool-call mediation between AI agents and a note vault.
//!
//! [`ToolMediator`] is the entry point: it recovers garbled calls, classifies
//! them, and runs them through [`AccessScopeGuard`], [`PermissionAuthority`]
//! and [`ApprovalCoordinator`] before invoking the handler from the
//! [`notegate_tools::ToolCatalog`].

pub mod agents;
pub mod approvals;
pub mod bounded_log;
pub mod classify;
pub mod decision_cache;
pub mod error;
pub mod mediator;
pub mod paths;
pub mod permissions;
pub mod recovery;
pub mod scope;

pub use agents::{AgentDirectory, StaticAgentDirectory};
pub use approvals::{ApprovalCoordinator, ApprovalHistoryEntry, ApprovalSurface, PendingApprovals};
pub use bounded_log::BoundedLog;
pub use classify::{ActionClassifier, extract_target_path};
pub use decision_cache::{DecisionCache, DecisionKey, TargetKey};
pub use error::NotegateCoreError;
pub use mediator::{ToolMediator, ToolMediatorBuilder};
pub use paths::normalize_path;
pub use permissions::{
    AccessLogEntry, ConfiguredZonePolicy, PermissionAuthority, PermissionResult,
    ZoneApprovalPolicy,
};
pub use recovery::{decompose_tool_name, recover_concatenated_call, split_concatenated_json};
pub use scope::{AccessDecision, AccessScopeGuard, ScopePattern};
