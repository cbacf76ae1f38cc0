//! Value types shared by the notegate mediation pipeline.
//!
//! Everything here crosses a crate boundary: tool-call requests as they arrive
//! from a model, the structured results handed back to the agent, the error
//! taxonomy those results carry, and the approval vocabulary spoken between the
//! pipeline and whatever surface renders prompts to the human operator.

mod approval;
mod tool;

pub use approval::{ApprovalAction, ApprovalDecision, ApprovalOutcome, ApprovalResponse};
pub use tool::ToolError;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// Abstract category a concrete tool call is classified into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Reads note content or metadata.
    Read,
    /// Creates or modifies vault content.
    Write,
    /// Removes vault content.
    Delete,
    /// Runs a command on the host.
    Execute,
    /// Enumerates or searches vault content.
    Search,
    /// Tool is not present in any classification table.
    Unknown,
}

impl ActionKind {
    /// Every action kind, in declaration order.
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Read,
        ActionKind::Write,
        ActionKind::Delete,
        ActionKind::Execute,
        ActionKind::Search,
        ActionKind::Unknown,
    ];

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Read => "read",
            ActionKind::Write => "write",
            ActionKind::Delete => "delete",
            ActionKind::Execute => "execute",
            ActionKind::Search => "search",
            ActionKind::Unknown => "unknown",
        }
    }

    /// Whether the action changes the vault or the host.
    pub fn is_destructive(self) -> bool {
        match self {
            ActionKind::Write | ActionKind::Delete | ActionKind::Execute => true,
            ActionKind::Read | ActionKind::Search | ActionKind::Unknown => false,
        }
    }

    /// Path visibility an action needs from the access scope.
    pub fn access_level(self) -> AccessLevel {
        if self.is_destructive() {
            AccessLevel::ReadWrite
        } else {
            AccessLevel::Read
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility granted by an access-scope entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// Path may be seen and read.
    #[default]
    Read,
    /// Path may be seen, read and modified.
    #[serde(alias = "read_write")]
    ReadWrite,
}

impl AccessLevel {
    /// Whether this level satisfies a requested level.
    pub fn permits(self, requested: AccessLevel) -> bool {
        match requested {
            AccessLevel::Read => true,
            AccessLevel::ReadWrite => self == AccessLevel::ReadWrite,
        }
    }
}

/// Arguments as received from the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawArguments {
    /// Unparsed argument text, possibly garbled.
    Text(String),
    /// Arguments the integration already decoded.
    Structured(Value),
}

impl Default for RawArguments {
    fn default() -> Self {
        RawArguments::Structured(Value::Object(Map::new()))
    }
}

impl From<String> for RawArguments {
    fn from(value: String) -> Self {
        RawArguments::Text(value)
    }
}

impl From<&str> for RawArguments {
    fn from(value: &str) -> Self {
        RawArguments::Text(value.to_string())
    }
}

impl From<Value> for RawArguments {
    fn from(value: Value) -> Self {
        RawArguments::Structured(value)
    }
}

/// A tool call as emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    /// Call id assigned by the model integration.
    pub id: String,
    /// Requested tool name.
    pub tool_name: String,
    /// Raw or structured arguments.
    #[serde(default)]
    pub arguments: RawArguments,
}

impl ToolCallRequest {
    /// Build a request from its parts.
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: impl Into<RawArguments>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Category of a mediation failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediationErrorKind {
    ArgumentParse,
    ToolNotFound,
    PermissionDenied,
    RepeatedDenial,
    ApprovalDenied,
    Execution,
}

/// Failures surfaced to the calling agent instead of aborting the conversation.
///
/// Messages are written for the agent, not the human: denial variants tell the
/// agent explicitly not to repeat the action.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MediationError {
    /// Raw arguments could not be turned into a JSON object.
    #[error("could not parse arguments for {tool}: {message}")]
    ArgumentParse { tool: String, message: String },
    /// Tool name is not registered, even after decomposition.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },
    /// Capability, scope or directory check failed.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },
    /// The same action was already declined during this session.
    #[error(
        "The user already denied {tool} on {} during this session. Do not repeat this action; ask the user directly if it is still needed.",
        describe_target(.target)
    )]
    RepeatedDenial {
        tool: String,
        target: Option<String>,
    },
    /// The human declined the approval prompt.
    #[error("{}", approval_denied_message(.tool, .target, .reason))]
    ApprovalDenied {
        tool: String,
        target: Option<String>,
        reason: Option<String>,
    },
    /// The tool handler reported a failure; carries the handler's own text.
    #[error("{0}")]
    Execution(String),
}

impl MediationError {
    /// Category of this error.
    pub fn kind(&self) -> MediationErrorKind {
        match self {
            MediationError::ArgumentParse { .. } => MediationErrorKind::ArgumentParse,
            MediationError::ToolNotFound { .. } => MediationErrorKind::ToolNotFound,
            MediationError::PermissionDenied { .. } => MediationErrorKind::PermissionDenied,
            MediationError::RepeatedDenial { .. } => MediationErrorKind::RepeatedDenial,
            MediationError::ApprovalDenied { .. } => MediationErrorKind::ApprovalDenied,
            MediationError::Execution(_) => MediationErrorKind::Execution,
        }
    }
}

fn describe_target(target: &Option<String>) -> String {
    match target.as_deref() {
        Some(path) if !path.is_empty() => format!("'{path}'"),
        _ => "any target".to_string(),
    }
}

fn approval_denied_message(tool: &str, target: &Option<String>, reason: &Option<String>) -> String {
    let mut message = format!(
        "The user denied {tool} on {}.",
        describe_target(target)
    );
    if let Some(reason) = reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        message.push_str(&format!(" Reason: {reason}."));
    }
    message.push_str(" Do not repeat this action without asking the user first.");
    message
}

/// Outcome carried by a tool-call result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ToolOutcome {
    /// Handler output, possibly filtered.
    Success { output: Value },
    /// Structured failure.
    Error {
        kind: MediationErrorKind,
        error: String,
    },
}

/// Structured result returned to the agent for one executed call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    /// Id of the call this result answers.
    pub id: String,
    /// Tool that was (or would have been) invoked.
    pub tool_name: String,
    /// Success payload or structured error.
    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

impl ToolCallResult {
    /// Successful result.
    pub fn success(id: impl Into<String>, tool_name: impl Into<String>, output: Value) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Success { output },
        }
    }

    /// Failed result built from a mediation error.
    pub fn failure(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        error: &MediationError,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Error {
                kind: error.kind(),
                error: error.to_string(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Error { .. })
    }

    pub fn error_kind(&self) -> Option<MediationErrorKind> {
        match &self.outcome {
            ToolOutcome::Error { kind, .. } => Some(*kind),
            ToolOutcome::Success { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Error { error, .. } => Some(error),
            ToolOutcome::Success { .. } => None,
        }
    }

    pub fn output(&self) -> Option<&Value> {
        match &self.outcome {
            ToolOutcome::Success { output } => Some(output),
            ToolOutcome::Error { .. } => None,
        }
    }

    /// JSON handed back to the agent: the output on success, otherwise
    /// `{ "isError": true, "error": ..., "errorKind": ... }`.
    pub fn to_agent_value(&self) -> Value {
        match &self.outcome {
            ToolOutcome::Success { output } => output.clone(),
            ToolOutcome::Error { kind, error } => json!({
                "isError": true,
                "error": error,
                "errorKind": kind,
            }),
        }
    }
}
