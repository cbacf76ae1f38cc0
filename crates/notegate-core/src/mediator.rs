//! The tool-call mediation pipeline.
//!
//! Every call runs the same gates in order: argument materialization, tool
//! lookup, agent resolution, classification, the access scope, the capability
//! check and, when required, the approval gate with its denial memory. Only
//! then is the handler invoked, and listing output is filtered on the way
//! back. Any failure becomes a structured [`ToolCallResult`]; nothing escapes
//! to the surrounding conversation loop.

use crate::agents::{AgentDirectory, StaticAgentDirectory};
use crate::approvals::{ApprovalCoordinator, ApprovalSurface};
use crate::classify::{ActionClassifier, extract_target_path};
use crate::decision_cache::{DecisionCache, DecisionKey, TargetKey};
use crate::error::NotegateCoreError;
use crate::permissions::{PermissionAuthority, ZoneApprovalPolicy};
use crate::recovery::recover_concatenated_call;
use crate::scope::{AccessScopeGuard, ScopePattern};
use futures_util::FutureExt;
use log::{debug, info, warn};
use notegate_config::{AgentConfig, NotegateConfig};
use notegate_protocol::{
    ActionKind, ApprovalAction, MediationError, RawArguments, ToolCallRequest, ToolCallResult,
    ToolError,
};
use notegate_tools::{HostServices, OutputShape, PathListShape, Tool, ToolCatalog, ToolContext};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use uuid::Uuid;

/// Characters of a `content` argument shown in approval prompts.
const CONTENT_PREVIEW_CHARS: usize = 200;

/// Orchestrates every gate between a model's tool call and its handler.
pub struct ToolMediator {
    catalog: Arc<ToolCatalog>,
    known_tools: Vec<String>,
    agents: Arc<dyn AgentDirectory>,
    scope: Arc<AccessScopeGuard>,
    authority: Arc<PermissionAuthority>,
    approvals: Arc<ApprovalCoordinator>,
    classifier: ActionClassifier,
    denials: Mutex<DecisionCache>,
    host: Arc<HostServices>,
}

/// Builder wiring a [`ToolMediator`] from config and collaborators.
pub struct ToolMediatorBuilder {
    config: NotegateConfig,
    catalog: ToolCatalog,
    agents: Option<Arc<dyn AgentDirectory>>,
    surface: Option<Arc<dyn ApprovalSurface>>,
    zone_policy: Option<Arc<dyn ZoneApprovalPolicy>>,
    host: HostServices,
}

impl ToolMediatorBuilder {
    pub fn catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replace the directory seeded from `config.agents`.
    pub fn agent_directory(mut self, agents: Arc<dyn AgentDirectory>) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn approval_surface(mut self, surface: Arc<dyn ApprovalSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Replace the zone policy built from `permissions.zones`.
    pub fn zone_policy(mut self, policy: Arc<dyn ZoneApprovalPolicy>) -> Self {
        self.zone_policy = Some(policy);
        self
    }

    pub fn host(mut self, host: HostServices) -> Self {
        self.host = host;
        self
    }

    /// Validate the config and assemble the pipeline.
    pub fn build(self) -> Result<ToolMediator, NotegateCoreError> {
        self.config.validate()?;
        for agent in &self.config.agents {
            for entry in &agent.access_scope {
                ScopePattern::compile(&entry.pattern)?;
            }
        }

        let scope = AccessScopeGuard::new(&self.config.access);
        let authority = PermissionAuthority::new(&self.config.permissions)?;
        if let Some(policy) = self.zone_policy {
            authority.set_zone_policy(Some(policy));
        }
        let approvals = ApprovalCoordinator::new(&self.config.approvals);
        approvals.set_surface(self.surface);
        let agents: Arc<dyn AgentDirectory> = match self.agents {
            Some(agents) => agents,
            None => Arc::new(StaticAgentDirectory::new(self.config.agents.iter().cloned())),
        };

        let known_tools = self.catalog.names();
        info!(
            "tool mediator ready (tools={}, agents={}, no_go_zones={})",
            known_tools.len(),
            self.config.agents.len(),
            self.config.access.no_go_zones.len()
        );
        Ok(ToolMediator {
            catalog: Arc::new(self.catalog),
            known_tools,
            agents,
            scope: Arc::new(scope),
            authority: Arc::new(authority),
            approvals: Arc::new(approvals),
            classifier: ActionClassifier::new(&self.config.tools),
            denials: Mutex::new(DecisionCache::new()),
            host: Arc::new(self.host),
        })
    }
}

impl ToolMediator {
    /// Start building a mediator for `config`.
    pub fn builder(config: NotegateConfig) -> ToolMediatorBuilder {
        ToolMediatorBuilder {
            config,
            catalog: ToolCatalog::new(),
            agents: None,
            surface: None,
            zone_policy: None,
            host: HostServices::default(),
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn scope_guard(&self) -> &AccessScopeGuard {
        &self.scope
    }

    pub fn authority(&self) -> &PermissionAuthority {
        &self.authority
    }

    pub fn approvals(&self) -> &ApprovalCoordinator {
        &self.approvals
    }

    /// Run the calls of one model response strictly in order.
    pub async fn execute_tool_calls(
        &self,
        requests: Vec<ToolCallRequest>,
        agent_name: &str,
    ) -> Vec<ToolCallResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.extend(self.execute_tool_call(request, agent_name).await);
        }
        results
    }

    /// Mediate one call.
    ///
    /// Usually yields a single result. A call whose name is a concatenation of
    /// known tool names is split first, and each part yields its own result.
    pub async fn execute_tool_call(
        &self,
        request: ToolCallRequest,
        agent_name: &str,
    ) -> Vec<ToolCallResult> {
        if !self.catalog.contains(&request.tool_name)
            && let Some(calls) = recover_concatenated_call(&request, &self.known_tools)
        {
            info!(
                "recovered concatenated tool call (id={}, name={}, parts={})",
                request.id,
                request.tool_name,
                calls.len()
            );
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.execute_single(call, agent_name).await);
            }
            return results;
        }
        vec![self.execute_single(request, agent_name).await]
    }

    /// Denials recorded for `agent_name` in the current session.
    pub fn denials_for(&self, agent_name: &str) -> Vec<DecisionKey> {
        self.denials.lock().for_agent(agent_name)
    }

    /// Forget the denials of one agent, e.g. when the operator switches agents.
    pub fn clear_denials_for(&self, agent_name: &str) -> usize {
        let cleared = self.denials.lock().clear_agent(agent_name);
        info!("denial memory cleared (agent={agent_name}, count={cleared})");
        cleared
    }

    /// Start a new conversation session. Denial memory is dropped;
    /// always-approved rules live for the whole process.
    pub fn switch_session(&self) {
        let mut denials = self.denials.lock();
        info!("session switched (denials_cleared={})", denials.len());
        denials.clear();
    }

    async fn execute_single(&self, request: ToolCallRequest, agent_name: &str) -> ToolCallResult {
        match self.mediate(&request, agent_name).await {
            Ok(output) => ToolCallResult::success(request.id, request.tool_name, output),
            Err(err) => {
                warn!(
                    "tool call failed (id={}, tool={}, agent={}, kind={:?}): {}",
                    request.id,
                    request.tool_name,
                    agent_name,
                    err.kind(),
                    err
                );
                ToolCallResult::failure(request.id, request.tool_name, &err)
            }
        }
    }

    async fn mediate(
        &self,
        request: &ToolCallRequest,
        agent_name: &str,
    ) -> Result<Value, MediationError> {
        let tool_name = request.tool_name.as_str();
        let args = materialize_arguments(tool_name, &request.arguments)?;
        let tool = self
            .catalog
            .get(tool_name)
            .ok_or_else(|| MediationError::ToolNotFound {
                tool: tool_name.to_string(),
            })?;

        let agent = self
            .agents
            .get_agent(agent_name)
            .ok_or_else(|| MediationError::PermissionDenied {
                reason: format!("unknown agent '{agent_name}'"),
            })?;
        if !agent.tool_enabled(tool_name) {
            return Err(MediationError::PermissionDenied {
                reason: format!("{tool_name} is not enabled for agent {}", agent.name),
            });
        }

        let kind = self.classifier.classify(tool_name, &args);
        let target = extract_target_path(&args);
        debug!(
            "classified tool call (id={}, tool={}, action={}, target={:?})",
            request.id, tool_name, kind, target
        );

        let access = self
            .scope
            .check_access(&agent, target.as_deref(), kind.access_level());
        if !access.allowed {
            return Err(MediationError::PermissionDenied {
                reason: access.reason,
            });
        }

        let permission =
            self.authority
                .check_permission(&agent, tool_name, kind, target.as_deref());
        if !permission.allowed {
            return Err(MediationError::PermissionDenied {
                reason: permission.reason,
            });
        }
        if permission.requires_approval {
            self.approval_gate(&agent, tool_name, kind, target.as_deref(), &args)
                .await?;
        }

        let output = self.invoke(&tool, &request.id, &agent.name, args).await?;
        Ok(match tool.output_shape() {
            OutputShape::Opaque => output,
            OutputShape::PathList(shape) => self.filter_output(&agent, &shape, output),
        })
    }

    /// Denial memory first, then the coordinator.
    async fn approval_gate(
        &self,
        agent: &AgentConfig,
        tool_name: &str,
        kind: ActionKind,
        target: Option<&str>,
        args: &Value,
    ) -> Result<(), MediationError> {
        let key = DecisionKey::new(&agent.name, tool_name, TargetKey::from_target(target));
        if self.denials.lock().contains(&key) {
            info!(
                "repeated denial short-circuited (agent={}, tool={}, target={})",
                agent.name, tool_name, key.target
            );
            return Err(MediationError::RepeatedDenial {
                tool: tool_name.to_string(),
                target: target.map(str::to_string),
            });
        }

        let action = ApprovalAction {
            request_id: Uuid::new_v4(),
            agent_name: agent.name.clone(),
            tool_name: tool_name.to_string(),
            action_kind: kind,
            target_path: target.map(str::to_string),
            description: describe_action(&agent.name, tool_name, kind, target, args),
            content_preview: content_preview(args),
        };
        let response = self.approvals.request_approval(action).await;
        if response.decision.is_approved() {
            return Ok(());
        }

        info!(
            "denial recorded (agent={}, tool={}, target={})",
            agent.name, tool_name, key.target
        );
        self.denials.lock().insert(key);
        Err(MediationError::ApprovalDenied {
            tool: tool_name.to_string(),
            target: target.map(str::to_string),
            reason: response.reason,
        })
    }

    async fn invoke(
        &self,
        tool: &Arc<dyn Tool>,
        call_id: &str,
        agent_name: &str,
        args: Value,
    ) -> Result<Value, MediationError> {
        let ctx = ToolContext::new(call_id, agent_name, tool.name(), self.host.clone());
        let outcome = AssertUnwindSafe(tool.execute(&ctx, args))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(output)) => match reported_error(&output) {
                Some(message) => Err(MediationError::Execution(message)),
                None => Ok(output),
            },
            Ok(Err(err)) => Err(MediationError::Execution(handler_error_text(err))),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(
                    "tool handler panicked (tool={}, call_id={}): {}",
                    tool.name(),
                    call_id,
                    message
                );
                Err(MediationError::Execution(format!(
                    "{} failed unexpectedly: {message}",
                    tool.name()
                )))
            }
        }
    }

    /// Filter a path-list output through the scope guard and fix its count.
    fn filter_output(&self, agent: &AgentConfig, shape: &PathListShape, mut output: Value) -> Value {
        let path_field = shape.path_field.as_deref();
        let items = match shape.items_field.as_deref() {
            Some(field) => output.get_mut(field).and_then(Value::as_array_mut),
            None => output.as_array_mut(),
        };
        let Some(items) = items else {
            debug!("path-list output without an item array; passing through");
            return output;
        };

        let kept = self
            .scope
            .filter_results(agent, std::mem::take(items), |item| match path_field {
                Some(field) => item.get(field).and_then(Value::as_str),
                None => item.as_str(),
            });
        let count = kept.len();
        *items = kept;

        if let Some(count_field) = shape.count_field.as_deref()
            && let Some(map) = output.as_object_mut()
        {
            map.insert(count_field.to_string(), json!(count));
        }
        output
    }
}

/// Turn raw arguments into a JSON object. Empty input is `{}`.
fn materialize_arguments(tool_name: &str, raw: &RawArguments) -> Result<Value, MediationError> {
    let value = match raw {
        RawArguments::Structured(value) => value.clone(),
        RawArguments::Text(text) if text.trim().is_empty() => Value::Object(Map::new()),
        RawArguments::Text(text) => {
            serde_json::from_str(text).map_err(|err| MediationError::ArgumentParse {
                tool: tool_name.to_string(),
                message: err.to_string(),
            })?
        }
    };
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        other => Err(MediationError::ArgumentParse {
            tool: tool_name.to_string(),
            message: format!("expected a JSON object, got {}", json_type(&other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Error text from a handler payload shaped `{ "isError": true, "error": ... }`.
fn reported_error(output: &Value) -> Option<String> {
    if output.get("isError").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    Some(match output.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => "tool reported an error without details".to_string(),
    })
}

fn handler_error_text(err: ToolError) -> String {
    match err {
        ToolError::ExecutionFailed(message) => message,
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

/// One-line summary shown in the approval prompt.
fn describe_action(
    agent_name: &str,
    tool_name: &str,
    kind: ActionKind,
    target: Option<&str>,
    args: &Value,
) -> String {
    if kind == ActionKind::Execute
        && let Some(command) = args.get("command").and_then(Value::as_str)
    {
        return format!("{agent_name} wants to run `{command}` via {tool_name}");
    }
    let verb = match kind {
        ActionKind::Read => "read",
        ActionKind::Write => "modify",
        ActionKind::Delete => "delete",
        ActionKind::Execute => "run a command on",
        ActionKind::Search => "search",
        ActionKind::Unknown => "use",
    };
    match target {
        Some(path) => format!("{agent_name} wants to {verb} '{path}' via {tool_name}"),
        None => format!("{agent_name} wants to call {tool_name} ({kind})"),
    }
}

fn content_preview(args: &Value) -> Option<String> {
    let content = args.get("content").and_then(Value::as_str)?;
    let mut preview: String = content.chars().take(CONTENT_PREVIEW_CHARS).collect();
    if preview.len() < content.len() {
        preview.push_str("...");
    }
    Some(preview)
}
