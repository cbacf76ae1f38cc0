/// Errors returned by tool handlers.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Handler received arguments it cannot use.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// Target of the operation does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Handler failed while executing.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}
