//! Schema validation helpers for notegate JSON5 configuration.

use crate::ConfigError;
use notegate_protocol::ActionKind;
use serde_json::{Map, Value};

const CAPABILITIES: &[&str] = &[
    "read_notes",
    "edit_notes",
    "create_files",
    "delete_files",
    "execute_commands",
    "yolo_mode",
    "guidance_mode",
];

/// Validate a config layer, or the merged config, against the schema.
///
/// Every layer is held to the full schema: arrays replace rather than merge,
/// so a field missing from one layer cannot be supplied by another.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = [
        "$schema",
        "access",
        "permissions",
        "approvals",
        "tools",
        "agents",
    ];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("access") {
        validate_access(value, layer, "access")?;
    }
    if let Some(value) = map.get("permissions") {
        validate_permissions(value, layer, "permissions")?;
    }
    if let Some(value) = map.get("approvals") {
        validate_approvals(value, layer, "approvals")?;
    }
    if let Some(value) = map.get("tools") {
        validate_tools(value, layer, "tools")?;
    }
    if let Some(value) = map.get("agents") {
        let arr = expect_array(value, layer, "agents")?;
        for (idx, entry) in arr.iter().enumerate() {
            validate_agent(entry, layer, &format!("agents[{idx}]"))?;
        }
    }

    Ok(())
}

/// Validate the "access" block.
fn validate_access(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = [
        "no_go_zones",
        "private_namespace",
        "agents_folder",
        "shared_folders",
        "shared_config_file",
    ];
    ensure_allowed_keys(map, &allowed, layer, path)?;

    for key in ["no_go_zones", "shared_folders"] {
        if let Some(value) = map.get(key) {
            validate_string_array(value, layer, &join_path(path, key))?;
        }
    }
    for key in ["private_namespace", "agents_folder", "shared_config_file"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Validate the "permissions" block.
fn validate_permissions(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = [
        "unmapped_action",
        "action_capabilities",
        "tool_capabilities",
        "zones",
        "access_log_cap",
    ];
    ensure_allowed_keys(map, &allowed, layer, path)?;

    if let Some(value) = map.get("unmapped_action") {
        expect_one_of(
            value,
            &["allow", "deny"],
            layer,
            &join_path(path, "unmapped_action"),
            "invalid unmapped action policy",
        )?;
    }
    if let Some(value) = map.get("action_capabilities") {
        let table_path = join_path(path, "action_capabilities");
        let table = expect_object(value, layer, &table_path)?;
        ensure_allowed_keys(table, &action_kind_names(), layer, &table_path)?;
        for (kind, capability) in table {
            validate_capability(capability, layer, &join_path(&table_path, kind))?;
        }
    }
    if let Some(value) = map.get("tool_capabilities") {
        let table_path = join_path(path, "tool_capabilities");
        let table = expect_object(value, layer, &table_path)?;
        for (tool, capability) in table {
            validate_capability(capability, layer, &join_path(&table_path, tool))?;
        }
    }
    if let Some(value) = map.get("zones") {
        let arr = expect_array(value, layer, &join_path(path, "zones"))?;
        for (idx, entry) in arr.iter().enumerate() {
            validate_zone(entry, layer, &format!("{path}.zones[{idx}]"))?;
        }
    }
    if let Some(value) = map.get("access_log_cap") {
        expect_u64(value, layer, &join_path(path, "access_log_cap"))?;
    }
    Ok(())
}

/// Validate a single approval zone.
fn validate_zone(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["pattern", "require_approval"], layer, path)?;

    let pattern_path = join_path(path, "pattern");
    let pattern = map
        .get("pattern")
        .ok_or_else(|| invalid_field(layer, &pattern_path, "missing required field"))?;
    expect_string(pattern, layer, &pattern_path)?;

    let approval_path = join_path(path, "require_approval");
    let approval = map
        .get("require_approval")
        .ok_or_else(|| invalid_field(layer, &approval_path, "missing required field"))?;
    expect_bool(approval, layer, &approval_path)?;
    Ok(())
}

/// Validate the "approvals" block.
fn validate_approvals(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["history_cap"], layer, path)?;
    if let Some(value) = map.get("history_cap") {
        expect_u64(value, layer, &join_path(path, "history_cap"))?;
    }
    Ok(())
}

/// Validate the "tools" block.
fn validate_tools(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["classifications", "memory_tool", "read_only_memory_operations"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("classifications") {
        let table_path = join_path(path, "classifications");
        let table = expect_object(value, layer, &table_path)?;
        let kinds = action_kind_names();
        for (tool, kind) in table {
            expect_one_of(
                kind,
                &kinds,
                layer,
                &join_path(&table_path, tool),
                "invalid action kind",
            )?;
        }
    }
    if let Some(value) = map.get("memory_tool") {
        expect_string(value, layer, &join_path(path, "memory_tool"))?;
    }
    if let Some(value) = map.get("read_only_memory_operations") {
        validate_string_array(value, layer, &join_path(path, "read_only_memory_operations"))?;
    }
    Ok(())
}

/// Validate a single agent definition.
fn validate_agent(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = ["name", "capabilities", "access_scope", "enabled_tools"];
    ensure_allowed_keys(map, &allowed, layer, path)?;

    let name_path = join_path(path, "name");
    let Some(name) = map.get("name") else {
        return Err(invalid_field(layer, &name_path, "missing required field"));
    };
    expect_string(name, layer, &name_path)?;

    if let Some(value) = map.get("capabilities") {
        let caps_path = join_path(path, "capabilities");
        let caps = expect_object(value, layer, &caps_path)?;
        ensure_allowed_keys(caps, CAPABILITIES, layer, &caps_path)?;
        for (key, flag) in caps {
            expect_bool(flag, layer, &join_path(&caps_path, key))?;
        }
    }
    if let Some(value) = map.get("access_scope") {
        let arr = expect_array(value, layer, &join_path(path, "access_scope"))?;
        for (idx, entry) in arr.iter().enumerate() {
            validate_scope_entry(entry, layer, &format!("{path}.access_scope[{idx}]"))?;
        }
    }
    if let Some(value) = map.get("enabled_tools") {
        validate_string_array(value, layer, &join_path(path, "enabled_tools"))?;
    }
    Ok(())
}

/// Validate a single access scope entry.
fn validate_scope_entry(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["pattern", "access_level"], layer, path)?;

    let pattern_path = join_path(path, "pattern");
    let pattern = map
        .get("pattern")
        .ok_or_else(|| invalid_field(layer, &pattern_path, "missing required field"))?;
    expect_string(pattern, layer, &pattern_path)?;

    if let Some(value) = map.get("access_level") {
        expect_one_of(
            value,
            &["read", "readwrite", "read_write"],
            layer,
            &join_path(path, "access_level"),
            "invalid access level",
        )?;
    }
    Ok(())
}

fn action_kind_names() -> Vec<&'static str> {
    ActionKind::ALL.iter().map(|kind| kind.as_str()).collect()
}

/// Validate capability names.
fn validate_capability(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    expect_one_of(value, CAPABILITIES, layer, path, "invalid capability")
}

/// Expect a string drawn from a fixed vocabulary.
fn expect_one_of(
    value: &Value,
    allowed: &[&str],
    layer: &str,
    path: &str,
    message: &str,
) -> Result<(), ConfigError> {
    let Some(text) = value.as_str() else {
        return Err(invalid_field(layer, path, "expected string"));
    };
    if allowed.contains(&text) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, message))
    }
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON array or return a typed error.
fn expect_array<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Vec<Value>, ConfigError> {
    match value {
        Value::Array(arr) => Ok(arr),
        _ => Err(invalid_field(layer, path, "expected array")),
    }
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_string() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

/// Validate that a value is an array of strings.
fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let arr = expect_array(value, layer, path)?;
    for (idx, entry) in arr.iter().enumerate() {
        if !entry.is_string() {
            return Err(invalid_field(
                layer,
                &format!("{path}[{idx}]"),
                "expected string",
            ));
        }
    }
    Ok(())
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
