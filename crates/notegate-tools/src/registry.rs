//! Catalog of registered tools.

use crate::tool::{Tool, ToolSpec};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Name-indexed tool catalog.
///
/// Populated at startup and shared read-only afterwards; the mediator holds it
/// behind an `Arc`.
#[derive(Default, Clone)]
pub struct ToolCatalog {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool by name, replacing any tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!("registering tool (name={name})");
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("tool registered twice; keeping the latest (name={name})");
        }
    }

    /// Builder-style registration.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Fetch a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names in lexical order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool specs in name order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
