//! Session-scoped memory of approval decisions.
//!
//! Both the always-approved rules and the per-agent denial memory are sets of
//! `(agent, tool, target)` keys. Entries leave the cache only through an
//! explicit clear; nothing expires on its own.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Target half of a decision key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case", tag = "type", content = "path")]
pub enum TargetKey {
    /// A specific normalized vault path.
    Path(String),
    /// Any target, including calls that name none.
    Wildcard,
}

impl TargetKey {
    /// Key for an extracted target; calls without one map to the wildcard.
    pub fn from_target(target: Option<&str>) -> Self {
        match target {
            Some(path) if !path.is_empty() => TargetKey::Path(path.to_string()),
            _ => TargetKey::Wildcard,
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKey::Path(path) => f.write_str(path),
            TargetKey::Wildcard => f.write_str("*"),
        }
    }
}

/// `(agent, tool, target)` tuple identifying a remembered decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
pub struct DecisionKey {
    pub agent_name: String,
    pub tool_name: String,
    pub target: TargetKey,
}

impl DecisionKey {
    pub fn new(agent_name: impl Into<String>, tool_name: impl Into<String>, target: TargetKey) -> Self {
        Self {
            agent_name: agent_name.into(),
            tool_name: tool_name.into(),
            target,
        }
    }

    /// The `(agent, tool, *)` key covering this one.
    pub fn as_wildcard(&self) -> Self {
        Self {
            agent_name: self.agent_name.clone(),
            tool_name: self.tool_name.clone(),
            target: TargetKey::Wildcard,
        }
    }
}

/// Set of remembered decision keys.
#[derive(Debug, Clone, Default)]
pub struct DecisionCache {
    entries: HashSet<DecisionKey>,
}

impl DecisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key; returns false if it was already present.
    pub fn insert(&mut self, key: DecisionKey) -> bool {
        self.entries.insert(key)
    }

    pub fn remove(&mut self, key: &DecisionKey) -> bool {
        self.entries.remove(key)
    }

    /// Exact lookup, no wildcard fallback.
    pub fn contains(&self, key: &DecisionKey) -> bool {
        self.entries.contains(key)
    }

    /// Exact lookup, then the `(agent, tool, *)` rule.
    pub fn covers(&self, key: &DecisionKey) -> bool {
        self.contains(key) || (key.target != TargetKey::Wildcard && self.contains(&key.as_wildcard()))
    }

    /// Drop every key belonging to `agent_name` and return how many went.
    pub fn clear_agent(&mut self, agent_name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key| key.agent_name != agent_name);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keys for one agent, sorted.
    pub fn for_agent(&self, agent_name: &str) -> Vec<DecisionKey> {
        let mut keys: Vec<DecisionKey> = self
            .entries
            .iter()
            .filter(|key| key.agent_name == agent_name)
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<DecisionKey> {
        let mut keys: Vec<DecisionKey> = self.entries.iter().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{DecisionCache, DecisionKey, TargetKey};
    use pretty_assertions::assert_eq;

    fn key(agent: &str, tool: &str, target: Option<&str>) -> DecisionKey {
        DecisionKey::new(agent, tool, TargetKey::from_target(target))
    }

    #[test]
    fn wildcard_rule_covers_every_target_for_the_pair() {
        let mut cache = DecisionCache::new();
        cache.insert(key("scribe", "write_note", None));

        assert!(cache.covers(&key("scribe", "write_note", Some("a.md"))));
        assert!(cache.covers(&key("scribe", "write_note", Some("b/c.md"))));
        assert!(!cache.covers(&key("scribe", "delete_note", Some("a.md"))));
        assert!(!cache.covers(&key("other", "write_note", Some("a.md"))));
        assert!(!cache.contains(&key("scribe", "write_note", Some("a.md"))));
    }

    #[test]
    fn clear_agent_leaves_other_agents_alone() {
        let mut cache = DecisionCache::new();
        cache.insert(key("scribe", "write_note", Some("a.md")));
        cache.insert(key("scribe", "delete_note", Some("a.md")));
        cache.insert(key("critic", "write_note", Some("a.md")));

        assert_eq!(cache.clear_agent("scribe"), 2);
        assert_eq!(cache.keys(), vec![key("critic", "write_note", Some("a.md"))]);
    }

    #[test]
    fn empty_target_is_the_wildcard() {
        assert_eq!(TargetKey::from_target(Some("")), TargetKey::Wildcard);
        assert_eq!(TargetKey::Wildcard.to_string(), "*");
    }
}
