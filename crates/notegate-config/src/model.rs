//! Configuration schema for notegate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Re-export protocol action kinds (used in capability and classification tables).
pub use notegate_protocol::ActionKind;
/// Re-export protocol access levels (used in access scopes).
pub use notegate_protocol::AccessLevel;

/// Root config for a vault.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotegateConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
    #[serde(default)]
    pub approvals: ApprovalsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

impl NotegateConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> NotegateConfigBuilder {
        NotegateConfigBuilder::new()
    }
}

/// Builder for assembling a `NotegateConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct NotegateConfigBuilder {
    config: NotegateConfig,
}

impl NotegateConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: NotegateConfig::default(),
        }
    }

    /// Replace the path visibility configuration.
    pub fn access(mut self, access: AccessConfig) -> Self {
        self.config.access = access;
        self
    }

    /// Replace the capability and approval-zone configuration.
    pub fn permissions(mut self, permissions: PermissionsConfig) -> Self {
        self.config.permissions = permissions;
        self
    }

    /// Replace the approval history configuration.
    pub fn approvals(mut self, approvals: ApprovalsConfig) -> Self {
        self.config.approvals = approvals;
        self
    }

    /// Replace the tool classification configuration.
    pub fn tools(mut self, tools: ToolsConfig) -> Self {
        self.config.tools = tools;
        self
    }

    /// Append an agent definition.
    pub fn agent(mut self, agent: AgentConfig) -> Self {
        self.config.agents.push(agent);
        self
    }

    /// Finalize and return the built `NotegateConfig`.
    pub fn build(self) -> NotegateConfig {
        self.config
    }
}

/// Path visibility settings shared by every agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessConfig {
    /// Path prefixes no agent may see, whatever its scope or capabilities.
    #[serde(default)]
    pub no_go_zones: Vec<String>,
    /// Root of the private configuration namespace inside the vault.
    #[serde(default = "default_private_namespace")]
    pub private_namespace: String,
    /// Folder under the namespace holding one private folder per agent.
    #[serde(default = "default_agents_folder")]
    pub agents_folder: String,
    /// Namespace subfolders visible to every agent.
    #[serde(default = "default_shared_folders")]
    pub shared_folders: Vec<String>,
    /// Namespace file visible to every agent.
    #[serde(default = "default_shared_config_file")]
    pub shared_config_file: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            no_go_zones: Vec::new(),
            private_namespace: default_private_namespace(),
            agents_folder: default_agents_folder(),
            shared_folders: default_shared_folders(),
            shared_config_file: default_shared_config_file(),
        }
    }
}

fn default_private_namespace() -> String {
    ".notegate".to_string()
}

fn default_agents_folder() -> String {
    "agents".to_string()
}

fn default_shared_folders() -> Vec<String> {
    vec![
        "skills".to_string(),
        "workflows".to_string(),
        "templates".to_string(),
    ]
}

fn default_shared_config_file() -> String {
    "vault.json".to_string()
}

/// Named capability flags an agent may hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ReadNotes,
    EditNotes,
    CreateFiles,
    DeleteFiles,
    ExecuteCommands,
    /// Bypass capability and approval checks (never the no-go or scope checks).
    YoloMode,
    /// Treat the access scope as advisory.
    GuidanceMode,
}

impl Capability {
    /// Config name of the capability.
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::ReadNotes => "read_notes",
            Capability::EditNotes => "edit_notes",
            Capability::CreateFiles => "create_files",
            Capability::DeleteFiles => "delete_files",
            Capability::ExecuteCommands => "execute_commands",
            Capability::YoloMode => "yolo_mode",
            Capability::GuidanceMode => "guidance_mode",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set of an agent. Missing flags are false.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Capabilities {
    #[serde(default)]
    pub read_notes: bool,
    #[serde(default)]
    pub edit_notes: bool,
    #[serde(default)]
    pub create_files: bool,
    #[serde(default)]
    pub delete_files: bool,
    #[serde(default)]
    pub execute_commands: bool,
    #[serde(default)]
    pub yolo_mode: bool,
    #[serde(default)]
    pub guidance_mode: bool,
}

impl Capabilities {
    /// Whether the flag for `capability` is set.
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::ReadNotes => self.read_notes,
            Capability::EditNotes => self.edit_notes,
            Capability::CreateFiles => self.create_files,
            Capability::DeleteFiles => self.delete_files,
            Capability::ExecuteCommands => self.execute_commands,
            Capability::YoloMode => self.yolo_mode,
            Capability::GuidanceMode => self.guidance_mode,
        }
    }

    /// Return a copy with `capability` set.
    pub fn with(mut self, capability: Capability) -> Self {
        let flag = match capability {
            Capability::ReadNotes => &mut self.read_notes,
            Capability::EditNotes => &mut self.edit_notes,
            Capability::CreateFiles => &mut self.create_files,
            Capability::DeleteFiles => &mut self.delete_files,
            Capability::ExecuteCommands => &mut self.execute_commands,
            Capability::YoloMode => &mut self.yolo_mode,
            Capability::GuidanceMode => &mut self.guidance_mode,
        };
        *flag = true;
        self
    }

    /// Every ordinary capability, without yolo or guidance mode.
    pub fn standard() -> Self {
        Self {
            read_notes: true,
            edit_notes: true,
            create_files: true,
            delete_files: true,
            execute_commands: true,
            yolo_mode: false,
            guidance_mode: false,
        }
    }
}

/// One whitelist entry of an agent's access scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScopeEntry {
    pub pattern: String,
    #[serde(default)]
    pub access_level: AccessLevel,
}

impl ScopeEntry {
    pub fn read(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            access_level: AccessLevel::Read,
        }
    }

    pub fn read_write(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            access_level: AccessLevel::ReadWrite,
        }
    }
}

/// Agent identity, capabilities and visibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Ordered whitelist; empty means unrestricted.
    #[serde(default)]
    pub access_scope: Vec<ScopeEntry>,
    /// Tools this agent may call; empty means all.
    #[serde(default)]
    pub enabled_tools: Vec<String>,
}

impl AgentConfig {
    /// Unrestricted agent with no capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Capabilities::default(),
            access_scope: Vec::new(),
            enabled_tools: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_scope(mut self, scope: Vec<ScopeEntry>) -> Self {
        self.access_scope = scope;
        self
    }

    pub fn with_enabled_tools(mut self, tools: Vec<String>) -> Self {
        self.enabled_tools = tools;
        self
    }

    /// Whether the agent may call `tool_name` at all.
    pub fn tool_enabled(&self, tool_name: &str) -> bool {
        self.enabled_tools.is_empty() || self.enabled_tools.iter().any(|tool| tool == tool_name)
    }
}

/// What happens to an action kind with no capability mapping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedActionPolicy {
    Allow,
    #[default]
    Deny,
}

/// Capability model and approval zones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub unmapped_action: UnmappedActionPolicy,
    /// Capability each action kind requires.
    #[serde(default = "default_action_capabilities")]
    pub action_capabilities: BTreeMap<ActionKind, Capability>,
    /// Tools that require a different capability than their action kind.
    #[serde(default = "default_tool_capabilities")]
    pub tool_capabilities: BTreeMap<String, Capability>,
    /// Explicit approval requirements by path pattern; first match wins.
    #[serde(default)]
    pub zones: Vec<ZoneRule>,
    #[serde(default = "default_log_cap")]
    pub access_log_cap: usize,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            unmapped_action: UnmappedActionPolicy::default(),
            action_capabilities: default_action_capabilities(),
            tool_capabilities: default_tool_capabilities(),
            zones: Vec::new(),
            access_log_cap: default_log_cap(),
        }
    }
}

fn default_action_capabilities() -> BTreeMap<ActionKind, Capability> {
    BTreeMap::from([
        (ActionKind::Read, Capability::ReadNotes),
        (ActionKind::Write, Capability::EditNotes),
        (ActionKind::Delete, Capability::DeleteFiles),
        (ActionKind::Execute, Capability::ExecuteCommands),
        (ActionKind::Search, Capability::ReadNotes),
    ])
}

fn default_tool_capabilities() -> BTreeMap<String, Capability> {
    BTreeMap::from([
        ("create_note".to_string(), Capability::CreateFiles),
        ("create_folder".to_string(), Capability::CreateFiles),
    ])
}

/// Default cap shared by the access log and the approval history.
fn default_log_cap() -> usize {
    1000
}

/// Approval requirement for paths matching a pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneRule {
    pub pattern: String,
    pub require_approval: bool,
}

/// Approval history settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalsConfig {
    #[serde(default = "default_log_cap")]
    pub history_cap: usize,
}

impl Default for ApprovalsConfig {
    fn default() -> Self {
        Self {
            history_cap: default_log_cap(),
        }
    }
}

/// Tool classification settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolsConfig {
    /// Extra tool-name to action-kind entries, overriding the built-in table.
    #[serde(default)]
    pub classifications: BTreeMap<String, ActionKind>,
    /// Tool whose action kind depends on its `operation` argument.
    #[serde(default = "default_memory_tool")]
    pub memory_tool: String,
    /// `operation` values that make the memory tool a read.
    #[serde(default = "default_read_only_memory_operations")]
    pub read_only_memory_operations: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            classifications: BTreeMap::new(),
            memory_tool: default_memory_tool(),
            read_only_memory_operations: default_read_only_memory_operations(),
        }
    }
}

fn default_memory_tool() -> String {
    "update_memory".to_string()
}

fn default_read_only_memory_operations() -> Vec<String> {
    vec!["read".to_string(), "view".to_string()]
}
