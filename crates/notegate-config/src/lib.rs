//! Configuration models and layered config loading.
//!
//! This crate owns the notegate config schema, validation, and the layer
//! merging used to assemble the effective config for a vault.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
/// Configuration schema models.
pub use model::*;
