//! Agent lookup used to resolve the requesting identity.

use log::info;
use notegate_config::AgentConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves an agent name to its configuration.
pub trait AgentDirectory: Send + Sync {
    fn get_agent(&self, name: &str) -> Option<Arc<AgentConfig>>;
}

/// In-memory directory seeded from configuration.
#[derive(Default)]
pub struct StaticAgentDirectory {
    agents: RwLock<HashMap<String, Arc<AgentConfig>>>,
}

impl StaticAgentDirectory {
    pub fn new(agents: impl IntoIterator<Item = AgentConfig>) -> Self {
        let agents = agents
            .into_iter()
            .map(|agent| (agent.name.clone(), Arc::new(agent)))
            .collect();
        Self {
            agents: RwLock::new(agents),
        }
    }

    /// Insert or replace an agent definition.
    pub fn upsert(&self, agent: AgentConfig) {
        info!("agent registered (name={})", agent.name);
        self.agents
            .write()
            .insert(agent.name.clone(), Arc::new(agent));
    }

    pub fn remove(&self, name: &str) -> bool {
        self.agents.write().remove(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl AgentDirectory for StaticAgentDirectory {
    fn get_agent(&self, name: &str) -> Option<Arc<AgentConfig>> {
        self.agents.read().get(name).cloned()
    }
}
