//! Layered configuration loader.
//!
//! Discovers configuration layers (user, vault, runtime overrides), validates
//! their schema, merges them and produces the final `NotegateConfig`.

mod layer_io;
mod merge;
mod schema;

#[cfg(test)]
mod tests;

use crate::{ConfigError, NotegateConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in every layer.
const DEFAULT_CONFIG_FILE: &str = "notegate.json5";
/// Default config directory under the home directory or vault root.
const DEFAULT_CONFIG_DIR: &str = ".notegate";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: NotegateConfig,
    /// Metadata for each layer that contributed.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Configuration stored inside the vault.
    Vault,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk.
    pub path: PathBuf,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Vault root; its `.notegate/notegate.json5` is the vault layer.
    pub vault_root: PathBuf,
    /// Optional user config path (defaults to `~/.notegate/notegate.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last.
    pub runtime_paths: Vec<PathBuf>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided vault.
    pub fn new(vault_root: impl AsRef<Path>) -> Self {
        Self {
            vault_root: vault_root.as_ref().to_path_buf(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
        }
    }

    /// Skip the user layer.
    pub fn without_user_layer(mut self) -> Self {
        self.user_config_path = None;
        self
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl NotegateConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack.
    ///
    /// Layer precedence (low -> high): user, vault, runtime overrides.
    pub fn load_layered(options: LayeredConfigOptions) -> Result<LayeredConfig, ConfigError> {
        let mut candidates = Vec::new();
        if let Some(path) = options.user_config_path.as_deref() {
            candidates.push((ConfigLayerSource::User, path.to_path_buf(), false));
        }
        candidates.push((
            ConfigLayerSource::Vault,
            options
                .vault_root
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILE),
            false,
        ));
        for path in &options.runtime_paths {
            candidates.push((ConfigLayerSource::Runtime, path.clone(), true));
        }

        let mut layers = Vec::new();
        let mut seen_paths = HashSet::new();
        let mut merged = Value::Object(serde_json::Map::new());
        for (source, path, required) in candidates {
            if !required && !path.exists() {
                debug!(
                    "skipping missing layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let unique = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen_paths.insert(unique) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let loaded = layer_io::load_layer(source, &path)?;
            merge::merge_json_values(&mut merged, &loaded.value);
            layers.push(loaded.meta);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access.private_namespace.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "access.private_namespace cannot be empty".to_string(),
            ));
        }
        if self.access.no_go_zones.iter().any(|zone| zone.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "access.no_go_zones cannot contain empty prefixes".to_string(),
            ));
        }
        if self.permissions.access_log_cap == 0 {
            return Err(ConfigError::Invalid(
                "permissions.access_log_cap must be positive".to_string(),
            ));
        }
        if self.approvals.history_cap == 0 {
            return Err(ConfigError::Invalid(
                "approvals.history_cap must be positive".to_string(),
            ));
        }
        if self
            .permissions
            .zones
            .iter()
            .any(|zone| zone.pattern.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "approval zones require a pattern".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                return Err(ConfigError::Invalid("agent names cannot be empty".to_string()));
            }
            if !names.insert(agent.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate agent name: {}",
                    agent.name
                )));
            }
            if agent
                .access_scope
                .iter()
                .any(|entry| entry.pattern.trim().is_empty())
            {
                return Err(ConfigError::Invalid(format!(
                    "agent {} has an empty access scope pattern",
                    agent.name
                )));
            }
        }

        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<NotegateConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: NotegateConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
