//! Error types for the mediation core.

use notegate_config::ConfigError;
use thiserror::Error;

/// Errors raised while assembling the mediation pipeline.
///
/// Per-call failures never use this type; they become `MediationError`
/// results handed back to the agent.
#[derive(Debug, Error)]
pub enum NotegateCoreError {
    /// A scope or zone pattern could not be compiled.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
    /// Configuration failed validation.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
