//! Tests for configuration loading and validation.

use super::*;
use crate::{Capability, UnmappedActionPolicy};
use notegate_protocol::{AccessLevel, ActionKind};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

#[test]
fn parse_minimal_config() {
    let config = NotegateConfig::load_from_str("{}").expect("config");
    assert_eq!(config.access.private_namespace, ".notegate");
    assert_eq!(config.permissions.unmapped_action, UnmappedActionPolicy::Deny);
    assert_eq!(
        config.permissions.action_capabilities.get(&ActionKind::Write),
        Some(&Capability::EditNotes)
    );
    assert_eq!(
        config.permissions.tool_capabilities.get("create_note"),
        Some(&Capability::CreateFiles)
    );
    assert_eq!(config.approvals.history_cap, 1000);
    assert!(config.agents.is_empty());
}

#[test]
fn parses_agents_with_scopes_and_capabilities() {
    let json5 = r#"{
        access: { no_go_zones: ["_private"] },
        agents: [
            {
                name: "scribe",
                capabilities: { read_notes: true, edit_notes: true },
                access_scope: [
                    { pattern: "Projects/**", access_level: "read" },
                    { pattern: "Inbox", access_level: "readwrite" },
                ],
            },
        ],
    }"#;
    let config = NotegateConfig::load_from_str(json5).expect("config");

    assert_eq!(config.access.no_go_zones, vec!["_private".to_string()]);
    let agent = &config.agents[0];
    assert!(agent.capabilities.has(Capability::EditNotes));
    assert!(!agent.capabilities.has(Capability::DeleteFiles));
    assert_eq!(agent.access_scope[1].access_level, AccessLevel::ReadWrite);
    assert!(agent.tool_enabled("anything"));
}

#[test]
fn rejects_unknown_top_level_key() {
    let err = NotegateConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

#[test]
fn rejects_unknown_capability_with_path() {
    let json5 = r#"{ agents: [ { name: "a", capabilities: { fly: true } } ] }"#;
    let err = NotegateConfig::load_from_str(json5).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("agents[0].capabilities.fly"), "{msg}");
}

#[test]
fn rejects_invalid_access_level() {
    let json5 = r#"{ agents: [ { name: "a", access_scope: [ { pattern: "x", access_level: "admin" } ] } ] }"#;
    let err = NotegateConfig::load_from_str(json5).unwrap_err();
    assert!(format!("{err}").contains("invalid access level"));
}

#[test]
fn rejects_duplicate_agent_names() {
    let json5 = r#"{ agents: [ { name: "a" }, { name: "a" } ] }"#;
    let err = NotegateConfig::load_from_str(json5).unwrap_err();
    assert!(format!("{err}").contains("duplicate agent name"));
}

#[test]
fn rejects_zero_history_cap() {
    let err = NotegateConfig::load_from_str(r#"{ approvals: { history_cap: 0 } }"#).unwrap_err();
    assert!(format!("{err}").contains("history_cap"));
}

#[test]
fn runtime_layer_overrides_vault_layer() {
    let temp = TempDir::new().expect("tmp");
    let vault = temp.path().join("vault");
    write_json5(
        &vault.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
        r#"{ access: { no_go_zones: ["_private"], shared_config_file: "shared.json" } }"#,
    );
    let runtime = temp.path().join("runtime.json5");
    write_json5(&runtime, r#"{ access: { no_go_zones: ["Secrets"] } }"#);

    let options = LayeredConfigOptions::new(&vault)
        .without_user_layer()
        .with_runtime_path(&runtime);
    let layered = NotegateConfig::load_layered(options).expect("layered");

    assert_eq!(layered.layers.len(), 2);
    assert_eq!(layered.layers[0].source, ConfigLayerSource::Vault);
    assert_eq!(
        layered.config.access.no_go_zones,
        vec!["Secrets".to_string()]
    );
    assert_eq!(layered.config.access.shared_config_file, "shared.json");
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options = LayeredConfigOptions::new(temp.path())
        .without_user_layer()
        .with_runtime_path(temp.path().join("missing.json5"));
    let err = NotegateConfig::load_layered(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
    assert!(format!("{err}").starts_with("failed to read notegate config"));
}

#[test]
fn user_layer_is_lowest_precedence() {
    let temp = TempDir::new().expect("tmp");
    let user = temp.path().join("user.json5");
    write_json5(
        &user,
        r#"{ approvals: { history_cap: 10 }, permissions: { access_log_cap: 20 } }"#,
    );
    let vault = temp.path().join("vault");
    write_json5(
        &vault.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
        r#"{ approvals: { history_cap: 30 } }"#,
    );

    let mut options = LayeredConfigOptions::new(&vault);
    options.user_config_path = Some(user);
    let layered = NotegateConfig::load_layered(options).expect("layered");

    assert_eq!(layered.config.approvals.history_cap, 30);
    assert_eq!(layered.config.permissions.access_log_cap, 20);
}

#[test]
fn every_layer_must_name_its_agents() {
    let temp = TempDir::new().expect("tmp");
    let vault = temp.path().join("vault");
    write_json5(
        &vault.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
        r#"{ agents: [ { capabilities: { read_notes: true } } ] }"#,
    );

    let err = NotegateConfig::load_layered(LayeredConfigOptions::new(&vault).without_user_layer())
        .unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("vault("), "{msg}");
    assert!(msg.contains("agents[0].name: missing required field"), "{msg}");
}

#[test]
fn classifications_accept_only_known_action_kinds() {
    let config = NotegateConfig::load_from_str(
        r#"{ tools: { classifications: { archive_note: "delete" } } }"#,
    )
    .expect("config");
    assert_eq!(
        config.tools.classifications.get("archive_note"),
        Some(&ActionKind::Delete)
    );

    let err = NotegateConfig::load_from_str(
        r#"{ tools: { classifications: { archive_note: "shred" } } }"#,
    )
    .unwrap_err();
    assert!(format!("{err}").contains("invalid action kind"));
}
