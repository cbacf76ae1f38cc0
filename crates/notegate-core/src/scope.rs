//! Path visibility enforcement.
//!
//! The guard answers one question: may this agent see (or modify) this path?
//! It knows nothing about capabilities. Checks run in a fixed order: the
//! process-wide no-go zones, then the unrestricted shortcuts, then the private
//! configuration namespace, and finally the agent's own scope entries.

use crate::error::NotegateCoreError;
use crate::paths::{is_within, normalize_path};
use log::{debug, info, warn};
use notegate_config::{AccessConfig, AgentConfig, ScopeEntry};
use notegate_protocol::AccessLevel;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Compiled path pattern used by scope entries and approval zones.
#[derive(Debug, Clone)]
pub struct ScopePattern {
    raw: String,
    matcher: PatternMatcher,
}

#[derive(Debug, Clone)]
enum PatternMatcher {
    /// Folder reference: the folder itself and everything beneath it.
    Folder(String),
    /// File reference: exact equality only.
    File(String),
    /// `*` stays inside one segment, `**` crosses segments.
    Wildcard(Regex),
}

impl ScopePattern {
    /// Compile a pattern.
    pub fn compile(pattern: &str) -> Result<Self, NotegateCoreError> {
        let normalized = normalize_path(pattern);
        let matcher = if normalized.contains('*') {
            let regex = Regex::new(&wildcard_to_regex(&normalized)).map_err(|err| {
                NotegateCoreError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: err.to_string(),
                }
            })?;
            PatternMatcher::Wildcard(regex)
        } else if has_extension(&normalized) {
            PatternMatcher::File(normalized)
        } else {
            PatternMatcher::Folder(normalized)
        };
        Ok(Self {
            raw: pattern.to_string(),
            matcher,
        })
    }

    /// Pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a normalized path.
    pub fn matches(&self, path: &str) -> bool {
        match &self.matcher {
            PatternMatcher::Folder(folder) => is_within(path, folder),
            PatternMatcher::File(file) => path == file,
            PatternMatcher::Wildcard(regex) => regex.is_match(path),
        }
    }
}

fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                out.push_str(".*");
            } else {
                out.push_str("[^/]*");
            }
        } else {
            let mut buf = [0u8; 4];
            out.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
        }
    }
    out.push('$');
    out
}

/// Whether the last segment looks like `name.ext`. Dot-folders such as
/// `.obsidian` do not count.
fn has_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rfind('.') {
        Some(idx) => idx > 0 && idx + 1 < segment.len(),
        None => false,
    }
}

/// Outcome of a visibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: String,
}

impl AccessDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Layout of the private configuration namespace, normalized.
#[derive(Debug, Clone)]
struct PrivateNamespace {
    root: String,
    agents_root: String,
    shared_folders: Vec<String>,
    shared_config_file: String,
}

impl PrivateNamespace {
    fn from_config(config: &AccessConfig) -> Self {
        let root = normalize_path(&config.private_namespace);
        let join = |child: &str| normalize_path(&format!("{root}/{child}"));
        Self {
            agents_root: join(&config.agents_folder),
            shared_folders: config.shared_folders.iter().map(|folder| join(folder)).collect(),
            shared_config_file: join(&config.shared_config_file),
            root,
        }
    }

    fn contains(&self, path: &str) -> bool {
        !self.root.is_empty() && is_within(path, &self.root)
    }

    fn decide(&self, agent_name: &str, path: &str) -> AccessDecision {
        let own_folder = format!("{}/{}", self.agents_root, agent_name);
        if is_within(path, &own_folder) {
            return AccessDecision::allow("agent private folder");
        }
        if self.shared_folders.iter().any(|folder| is_within(path, folder)) {
            return AccessDecision::allow("shared system folder");
        }
        if path == self.shared_config_file {
            return AccessDecision::allow("shared vault configuration");
        }
        AccessDecision::deny(format!(
            "'{path}' is inside the private configuration area"
        ))
    }
}

/// Whitelist engine deciding which paths an agent may see or touch.
pub struct AccessScopeGuard {
    no_go_zones: RwLock<Vec<String>>,
    namespace: PrivateNamespace,
    compiled: RwLock<HashMap<String, Arc<ScopePattern>>>,
}

impl AccessScopeGuard {
    pub fn new(config: &AccessConfig) -> Self {
        Self {
            no_go_zones: RwLock::new(normalize_zones(&config.no_go_zones)),
            namespace: PrivateNamespace::from_config(config),
            compiled: RwLock::new(HashMap::new()),
        }
    }

    /// Current no-go prefixes, normalized.
    pub fn no_go_zones(&self) -> Vec<String> {
        self.no_go_zones.read().clone()
    }

    /// Replace the whole no-go list at once.
    pub fn replace_no_go_zones(&self, zones: &[String]) {
        let normalized = normalize_zones(zones);
        info!("no-go zones replaced (count={})", normalized.len());
        *self.no_go_zones.write() = normalized;
    }

    /// Whether a path falls under any no-go prefix.
    pub fn is_no_go(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.no_go_zones
            .read()
            .iter()
            .any(|zone| is_within(&path, zone))
    }

    /// Decide whether `agent` may access `path` at `level`.
    ///
    /// `None` (or an empty path) marks a scope-agnostic call.
    pub fn check_access(
        &self,
        agent: &AgentConfig,
        path: Option<&str>,
        level: AccessLevel,
    ) -> AccessDecision {
        let path = path.map(normalize_path).filter(|path| !path.is_empty());
        if let Some(path) = path.as_deref()
            && self.is_no_go(path)
        {
            warn!(
                "no-go zone blocked access (agent={}, path={})",
                agent.name, path
            );
            return AccessDecision::deny(format!("'{path}' is inside a no-go zone"));
        }
        if agent.access_scope.is_empty() {
            return AccessDecision::allow("unrestricted agent");
        }
        if agent.capabilities.guidance_mode {
            return AccessDecision::allow("guidance mode: scope is advisory");
        }
        let Some(path) = path else {
            return AccessDecision::allow("no target path");
        };
        let decision = self.scope_decision(agent, &path, level);
        if !decision.allowed {
            debug!(
                "scope denied access (agent={}, path={}, level={:?}, reason={})",
                agent.name, path, level, decision.reason
            );
        }
        decision
    }

    /// Drop items the agent may not see.
    ///
    /// No-go paths are removed for every agent. Scoped agents also lose items
    /// outside their scope and items whose path cannot be extracted.
    pub fn filter_results<T, F>(&self, agent: &AgentConfig, items: Vec<T>, path_of: F) -> Vec<T>
    where
        F: Fn(&T) -> Option<&str>,
    {
        let unrestricted = agent.access_scope.is_empty() || agent.capabilities.guidance_mode;
        let before = items.len();
        let kept: Vec<T> = items
            .into_iter()
            .filter(|item| {
                let Some(path) = path_of(item).map(normalize_path) else {
                    return unrestricted;
                };
                if self.is_no_go(&path) {
                    return false;
                }
                unrestricted || self.scope_decision(agent, &path, AccessLevel::Read).allowed
            })
            .collect();
        if kept.len() != before {
            debug!(
                "filtered results (agent={}, before={}, after={})",
                agent.name,
                before,
                kept.len()
            );
        }
        kept
    }

    fn scope_decision(&self, agent: &AgentConfig, path: &str, level: AccessLevel) -> AccessDecision {
        if self.namespace.contains(path) {
            return self.namespace.decide(&agent.name, path);
        }
        for entry in &agent.access_scope {
            let Some(pattern) = self.pattern_for(entry) else {
                continue;
            };
            if !pattern.matches(path) {
                continue;
            }
            if entry.access_level.permits(level) {
                return AccessDecision::allow(format!("matched scope '{}'", entry.pattern));
            }
            return AccessDecision::deny(format!(
                "scope '{}' grants read-only access to '{path}'",
                entry.pattern
            ));
        }
        AccessDecision::deny(format!("'{path}' is outside the access scope of {}", agent.name))
    }

    fn pattern_for(&self, entry: &ScopeEntry) -> Option<Arc<ScopePattern>> {
        if let Some(pattern) = self.compiled.read().get(&entry.pattern) {
            return Some(pattern.clone());
        }
        match ScopePattern::compile(&entry.pattern) {
            Ok(pattern) => {
                let pattern = Arc::new(pattern);
                self.compiled
                    .write()
                    .insert(entry.pattern.clone(), pattern.clone());
                Some(pattern)
            }
            Err(err) => {
                warn!("skipping scope entry ({err})");
                None
            }
        }
    }
}

fn normalize_zones(zones: &[String]) -> Vec<String> {
    zones
        .iter()
        .map(|zone| normalize_path(zone))
        .filter(|zone| !zone.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notegate_config::{Capabilities, Capability};
    use pretty_assertions::assert_eq;

    fn guard(no_go: &[&str]) -> AccessScopeGuard {
        AccessScopeGuard::new(&AccessConfig {
            no_go_zones: no_go.iter().map(|zone| zone.to_string()).collect(),
            ..AccessConfig::default()
        })
    }

    fn scoped(name: &str, scope: Vec<ScopeEntry>) -> AgentConfig {
        AgentConfig::new(name).with_scope(scope)
    }

    #[test]
    fn folder_pattern_matches_folder_and_descendants_only() {
        let pattern = ScopePattern::compile("Projects/").expect("pattern");
        assert!(pattern.matches("Projects"));
        assert!(pattern.matches("Projects/plan.md"));
        assert!(pattern.matches("Projects/deep/er.md"));
        assert!(!pattern.matches("ProjectsOld/plan.md"));
        assert!(!pattern.matches("Other/Projects/plan.md"));
    }

    #[test]
    fn file_pattern_matches_exactly() {
        let pattern = ScopePattern::compile("Inbox/todo.md").expect("pattern");
        assert!(pattern.matches("Inbox/todo.md"));
        assert!(!pattern.matches("Inbox/todo.md/child"));
        assert!(!pattern.matches("Inbox/todo.mdx"));
    }

    #[test]
    fn dot_folders_are_folders() {
        let pattern = ScopePattern::compile(".obsidian").expect("pattern");
        assert!(pattern.matches(".obsidian/app.json"));
    }

    #[test]
    fn single_star_stays_within_a_segment() {
        let pattern = ScopePattern::compile("Daily/*.md").expect("pattern");
        assert!(pattern.matches("Daily/2024-01-01.md"));
        assert!(!pattern.matches("Daily/archive/2023-01-01.md"));

        let pattern = ScopePattern::compile("Daily/**").expect("pattern");
        assert!(pattern.matches("Daily/archive/2023-01-01.md"));
        assert!(!pattern.matches("Dailyx/a.md"));
    }

    #[test]
    fn wildcard_escapes_regex_metacharacters() {
        let pattern = ScopePattern::compile("Notes (old)/*.md").expect("pattern");
        assert!(pattern.matches("Notes (old)/a.md"));
        assert!(!pattern.matches("Notes old/a.md"));
    }

    #[test]
    fn no_go_blocks_unrestricted_agents() {
        let guard = guard(&["_private"]);
        let agent = AgentConfig::new("scribe");

        let decision = guard.check_access(&agent, Some("_private/keys.md"), AccessLevel::Read);
        assert!(!decision.allowed);
        assert!(decision.reason.contains("no-go"));

        let decision = guard.check_access(&agent, Some("_privateer.md"), AccessLevel::Read);
        assert!(decision.allowed);
    }

    #[test]
    fn no_go_cannot_be_dodged_with_dot_segments() {
        let guard = guard(&["_private"]);
        let agent = AgentConfig::new("scribe");
        let decision = guard.check_access(
            &agent,
            Some("Projects/../_private/keys.md"),
            AccessLevel::Read,
        );
        assert!(!decision.allowed);
    }

    #[test]
    fn read_entry_denies_write_on_matched_path() {
        let guard = guard(&[]);
        let agent = scoped("scribe", vec![ScopeEntry::read("Projects/**")]);

        assert!(
            guard
                .check_access(&agent, Some("Projects/plan.md"), AccessLevel::Read)
                .allowed
        );
        let decision = guard.check_access(&agent, Some("Projects/plan.md"), AccessLevel::ReadWrite);
        assert!(!decision.allowed);
        assert!(decision.reason.contains("read-only"));
    }

    #[test]
    fn first_matching_entry_wins() {
        let guard = guard(&[]);
        let agent = scoped(
            "scribe",
            vec![
                ScopeEntry::read("Projects/archive"),
                ScopeEntry::read_write("Projects"),
            ],
        );
        assert!(
            !guard
                .check_access(&agent, Some("Projects/archive/a.md"), AccessLevel::ReadWrite)
                .allowed
        );
        assert!(
            guard
                .check_access(&agent, Some("Projects/live/a.md"), AccessLevel::ReadWrite)
                .allowed
        );
    }

    #[test]
    fn unmatched_path_is_denied_for_scoped_agents() {
        let guard = guard(&[]);
        let agent = scoped("scribe", vec![ScopeEntry::read_write("Projects")]);
        let decision = guard.check_access(&agent, Some("Journal/today.md"), AccessLevel::Read);
        assert!(!decision.allowed);
        assert!(decision.reason.contains("outside the access scope"));
    }

    #[test]
    fn guidance_mode_and_pathless_calls_are_allowed() {
        let guard = guard(&["_private"]);
        let guided = scoped("guide", vec![ScopeEntry::read("Projects")]).with_capabilities(
            Capabilities::default().with(Capability::GuidanceMode),
        );
        assert!(
            guard
                .check_access(&guided, Some("Journal/today.md"), AccessLevel::ReadWrite)
                .allowed
        );
        assert!(
            !guard
                .check_access(&guided, Some("_private/x.md"), AccessLevel::Read)
                .allowed
        );

        let agent = scoped("scribe", vec![ScopeEntry::read("Projects")]);
        assert!(guard.check_access(&agent, None, AccessLevel::ReadWrite).allowed);
        assert!(guard.check_access(&agent, Some("/"), AccessLevel::Read).allowed);
    }

    #[test]
    fn private_namespace_rules() {
        let guard = guard(&[]);
        let agent = scoped("scribe", vec![ScopeEntry::read_write("**")]);
        let check = |path: &str| {
            guard
                .check_access(&agent, Some(path), AccessLevel::ReadWrite)
                .allowed
        };

        assert!(check(".notegate/agents/scribe/memory.md"));
        assert!(check(".notegate/agents/scribe"));
        assert!(!check(".notegate/agents/critic/memory.md"));
        assert!(!check(".notegate/agents/scribe-two/memory.md"));
        assert!(check(".notegate/skills/summarize.md"));
        assert!(check(".notegate/workflows/weekly.md"));
        assert!(check(".notegate/vault.json"));
        assert!(!check(".notegate/secrets.json"));
        assert!(!check(".notegate"));
    }

    #[test]
    fn replace_no_go_zones_swaps_whole_list() {
        let guard = guard(&["_private"]);
        guard.replace_no_go_zones(&["Secrets/".to_string(), "".to_string()]);
        assert_eq!(guard.no_go_zones(), vec!["Secrets".to_string()]);
        assert!(!guard.is_no_go("_private/a.md"));
        assert!(guard.is_no_go("Secrets/a.md"));
    }

    #[test]
    fn filter_results_applies_no_go_and_scope() {
        let guard = guard(&["_private"]);
        let items = vec![
            "Projects/a.md".to_string(),
            "_private/b.md".to_string(),
            "Journal/c.md".to_string(),
        ];

        let unrestricted = AgentConfig::new("free");
        let kept = guard.filter_results(&unrestricted, items.clone(), |item| Some(item.as_str()));
        assert_eq!(kept, vec!["Projects/a.md".to_string(), "Journal/c.md".to_string()]);

        let agent = scoped("scribe", vec![ScopeEntry::read("Projects")]);
        let kept = guard.filter_results(&agent, items, |item| Some(item.as_str()));
        assert_eq!(kept, vec!["Projects/a.md".to_string()]);
    }

    #[test]
    fn filter_results_drops_pathless_items_only_for_scoped_agents() {
        let guard = guard(&[]);
        let items = vec![Some("Projects/a.md"), None];

        let kept = guard.filter_results(&AgentConfig::new("free"), items.clone(), |item| *item);
        assert_eq!(kept.len(), 2);

        let agent = scoped("scribe", vec![ScopeEntry::read("Projects")]);
        let kept = guard.filter_results(&agent, items, |item| *item);
        assert_eq!(kept, vec![Some("Projects/a.md")]);
    }
}
