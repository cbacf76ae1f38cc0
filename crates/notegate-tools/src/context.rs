//! Host context passed to tool handlers.

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Host-level services shared by every call (constructed once, shared via Arc).
#[derive(Debug, Clone, Default)]
pub struct HostServices {
    /// Root directory of the vault the tools operate on.
    pub vault_root: PathBuf,
    /// Free-form host metadata handed through to tools.
    pub metadata: Value,
}

/// Per-call context handed to a tool handler.
///
/// Identity fields are stored directly; shared host services live behind an
/// `Arc` so building a context per call is a reference-count bump.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Id of the call being executed.
    pub call_id: String,
    /// Agent that issued the call.
    pub agent_name: String,
    /// Tool being invoked.
    pub tool_name: String,
    /// Shared host services.
    pub host: Arc<HostServices>,
}

impl ToolContext {
    pub fn new(
        call_id: impl Into<String>,
        agent_name: impl Into<String>,
        tool_name: impl Into<String>,
        host: Arc<HostServices>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            agent_name: agent_name.into(),
            tool_name: tool_name.into(),
            host,
        }
    }

    /// Resolve a vault-relative path against the vault root.
    pub fn vault_path(&self, relative: &str) -> PathBuf {
        self.host.vault_root.join(relative.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::{HostServices, ToolContext};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn vault_path_stays_under_the_vault_root() {
        let host = Arc::new(HostServices {
            vault_root: PathBuf::from("/vault"),
            ..HostServices::default()
        });
        let ctx = ToolContext::new("call_1", "scribe", "read_note", host);

        assert_eq!(ctx.vault_path("Notes/a.md"), PathBuf::from("/vault/Notes/a.md"));
        assert_eq!(ctx.vault_path("/Notes/a.md"), PathBuf::from("/vault/Notes/a.md"));
    }
}
