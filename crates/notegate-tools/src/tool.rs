//! Tool trait definition and metadata spec.

use crate::context::ToolContext;
use async_trait::async_trait;
use notegate_protocol::ToolError;
use serde_json::Value;
use std::fmt::Debug;

/// Tool metadata spec for discovery and schema presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON schema for tool arguments.
    pub input_schema: Value,
}

/// Where the path-bearing items live in a listing or search result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathListShape {
    /// Field holding the item array; `None` when the output is the array itself.
    pub items_field: Option<String>,
    /// Field of each item holding its path; `None` when items are path strings.
    pub path_field: Option<String>,
    /// Field reporting the item count, recomputed after filtering.
    pub count_field: Option<String>,
}

impl PathListShape {
    /// Items under `items_field`, each carrying its path in `path_field`.
    pub fn new(items_field: impl Into<String>, path_field: impl Into<String>) -> Self {
        Self {
            items_field: Some(items_field.into()),
            path_field: Some(path_field.into()),
            count_field: None,
        }
    }

    pub fn with_count_field(mut self, count_field: impl Into<String>) -> Self {
        self.count_field = Some(count_field.into());
        self
    }
}

/// Shape of a tool's successful output, as far as mediation cares.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputShape {
    /// Passed back unchanged.
    #[default]
    Opaque,
    /// A list of path-bearing items filtered through the access scope.
    PathList(PathListShape),
}

/// Interface for executable tools.
#[async_trait]
pub trait Tool: Send + Sync + Debug {
    /// Return the tool name.
    fn name(&self) -> &str;
    /// Return the tool description.
    fn description(&self) -> &str;
    /// Return the JSON schema for tool arguments.
    fn input_schema(&self) -> Value;

    /// Output shape used for post-filtering.
    fn output_shape(&self) -> OutputShape {
        OutputShape::Opaque
    }

    /// Invoke the tool with a context and materialized arguments.
    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError>;

    /// Build a `ToolSpec` describing this tool.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}
