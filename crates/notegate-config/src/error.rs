//! Failures raised while reading a vault's gate configuration.

use thiserror::Error;

/// Why a notegate config layer could not be turned into a `NotegateConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A user, vault or runtime layer could not be read from disk.
    #[error("failed to read notegate config: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// The layer is not valid JSON5.
    #[error("failed to parse notegate config: {0}")]
    ParseFailed(#[from] json5::Error),
    /// The merged document does not fit the config model.
    #[error("failed to decode notegate config: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// Schema violation; `path` is `<layer>:<dotted.key>`.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// Cross-field check on the effective config, such as duplicate agents.
    #[error("invalid config: {0}")]
    Invalid(String),
}
