//! Tool handler interface and the catalog the mediator looks tools up in.

pub mod context;
pub mod registry;
pub mod tool;

/// Host context handed to tool handlers.
pub use context::{HostServices, ToolContext};
/// Name-indexed tool catalog.
pub use registry::ToolCatalog;
/// Tool trait, spec and output shape.
pub use tool::{OutputShape, PathListShape, Tool, ToolSpec};
