//! Tool-name to action-kind classification and target extraction.

use crate::paths::normalize_path;
use log::debug;
use notegate_config::ToolsConfig;
use notegate_protocol::ActionKind;
use serde_json::Value;
use std::collections::HashMap;

/// Built-in vocabulary of the vault tools.
const BUILTIN_CLASSIFICATIONS: &[(&str, ActionKind)] = &[
    ("read_note", ActionKind::Read),
    ("read_file", ActionKind::Read),
    ("get_note", ActionKind::Read),
    ("get_note_metadata", ActionKind::Read),
    ("get_backlinks", ActionKind::Read),
    ("list_folder", ActionKind::Read),
    ("list_notes", ActionKind::Read),
    ("list_files", ActionKind::Read),
    ("search_notes", ActionKind::Search),
    ("search_vault", ActionKind::Search),
    ("search_files", ActionKind::Search),
    ("grep_notes", ActionKind::Search),
    ("write_note", ActionKind::Write),
    ("write_file", ActionKind::Write),
    ("edit_note", ActionKind::Write),
    ("append_note", ActionKind::Write),
    ("prepend_note", ActionKind::Write),
    ("create_note", ActionKind::Write),
    ("create_folder", ActionKind::Write),
    ("move_note", ActionKind::Write),
    ("rename_note", ActionKind::Write),
    ("move_file", ActionKind::Write),
    ("update_frontmatter", ActionKind::Write),
    ("update_memory", ActionKind::Write),
    ("delete_note", ActionKind::Delete),
    ("delete_file", ActionKind::Delete),
    ("delete_folder", ActionKind::Delete),
    ("run_command", ActionKind::Execute),
    ("execute_command", ActionKind::Execute),
    ("run_script", ActionKind::Execute),
];

/// Argument fields that conventionally carry the target path, in lookup order.
const TARGET_FIELDS: &[&str] = &["path", "targetPath", "file", "folder"];

/// Classifies tool calls into action kinds.
#[derive(Debug, Clone)]
pub struct ActionClassifier {
    table: HashMap<String, ActionKind>,
    memory_tool: String,
    read_only_memory_operations: Vec<String>,
}

impl ActionClassifier {
    /// Built-in table extended (and overridden) by `config.classifications`.
    pub fn new(config: &ToolsConfig) -> Self {
        let mut table: HashMap<String, ActionKind> = BUILTIN_CLASSIFICATIONS
            .iter()
            .map(|(name, kind)| (name.to_string(), *kind))
            .collect();
        for (name, kind) in &config.classifications {
            table.insert(name.clone(), *kind);
        }
        Self {
            table,
            memory_tool: config.memory_tool.clone(),
            read_only_memory_operations: config.read_only_memory_operations.clone(),
        }
    }

    /// Action kind for a call. Unlisted tools are `Unknown`.
    pub fn classify(&self, tool_name: &str, args: &Value) -> ActionKind {
        let kind = self
            .table
            .get(tool_name)
            .copied()
            .unwrap_or(ActionKind::Unknown);
        if tool_name == self.memory_tool
            && let Some(operation) = args.get("operation").and_then(Value::as_str)
            && self
                .read_only_memory_operations
                .iter()
                .any(|candidate| candidate == operation)
        {
            debug!("memory tool reclassified as read (tool={tool_name}, operation={operation})");
            return ActionKind::Read;
        }
        kind
    }
}

/// Normalized target path from the conventional argument fields.
pub fn extract_target_path(args: &Value) -> Option<String> {
    TARGET_FIELDS
        .iter()
        .filter_map(|field| args.get(*field).and_then(Value::as_str))
        .map(normalize_path)
        .find(|path| !path.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn classifies_builtin_and_configured_tools() {
        let mut config = ToolsConfig::default();
        config
            .classifications
            .insert("summarize_folder".to_string(), ActionKind::Read);
        config
            .classifications
            .insert("write_note".to_string(), ActionKind::Delete);
        let classifier = ActionClassifier::new(&config);

        assert_eq!(classifier.classify("read_note", &json!({})), ActionKind::Read);
        assert_eq!(classifier.classify("search_notes", &json!({})), ActionKind::Search);
        assert_eq!(classifier.classify("summarize_folder", &json!({})), ActionKind::Read);
        assert_eq!(classifier.classify("write_note", &json!({})), ActionKind::Delete);
        assert_eq!(classifier.classify("teleport", &json!({})), ActionKind::Unknown);
    }

    #[test]
    fn memory_tool_is_read_only_for_listed_operations() {
        let classifier = ActionClassifier::new(&ToolsConfig::default());
        assert_eq!(
            classifier.classify("update_memory", &json!({ "operation": "view" })),
            ActionKind::Read
        );
        assert_eq!(
            classifier.classify("update_memory", &json!({ "operation": "append" })),
            ActionKind::Write
        );
        assert_eq!(classifier.classify("update_memory", &json!({})), ActionKind::Write);
        assert_eq!(
            classifier.classify("write_note", &json!({ "operation": "view" })),
            ActionKind::Write
        );
    }

    #[test]
    fn target_path_uses_first_non_empty_conventional_field() {
        assert_eq!(
            extract_target_path(&json!({ "path": "Notes\\a.md" })),
            Some("Notes/a.md".to_string())
        );
        assert_eq!(
            extract_target_path(&json!({ "path": "", "folder": "Projects/" })),
            Some("Projects".to_string())
        );
        assert_eq!(
            extract_target_path(&json!({ "targetPath": "x.md", "file": "y.md" })),
            Some("x.md".to_string())
        );
        assert_eq!(extract_target_path(&json!({ "query": "foo" })), None);
        assert_eq!(extract_target_path(&json!("not an object")), None);
    }
}
