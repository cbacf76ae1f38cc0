use async_trait::async_trait;
use notegate_protocol::ToolError;
use notegate_tools::{OutputShape, PathListShape, Tool, ToolContext};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Tool returning a fixed result and recording the arguments it saw.
#[derive(Debug)]
pub struct DummyTool {
    name: String,
    description: String,
    input_schema: Value,
    result: Value,
    calls: Mutex<Vec<Value>>,
}

impl DummyTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "dummy".to_string(),
            input_schema: json!({ "type": "object" }),
            result: json!({ "ok": true }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    /// Number of times the handler ran.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Arguments of every call, in order.
    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Tool for DummyTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.input_schema.clone()
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        self.calls.lock().push(args);
        Ok(self.result.clone())
    }
}

/// Tool whose handler always fails with `ExecutionFailed`.
#[derive(Debug)]
pub struct FailingTool {
    name: String,
    message: String,
}

impl FailingTool {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "always fails"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn execute(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, ToolError> {
        Err(ToolError::ExecutionFailed(self.message.clone()))
    }
}

/// Tool whose handler panics.
#[derive(Debug)]
pub struct PanickingTool {
    name: String,
}

impl PanickingTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "panics"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn execute(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, ToolError> {
        panic!("handler exploded");
    }
}

/// Listing tool that ignores its arguments and returns fixed paths as
/// `{ "items": [{ "path": ... }], "count": n }`.
#[derive(Debug)]
pub struct ListingTool {
    name: String,
    paths: Vec<String>,
}

impl ListingTool {
    pub fn new(name: impl Into<String>, paths: &[&str]) -> Self {
        Self {
            name: name.into(),
            paths: paths.iter().map(|path| path.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Tool for ListingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "lists fixed paths"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": { "folder": { "type": "string" } } })
    }

    fn output_shape(&self) -> OutputShape {
        OutputShape::PathList(PathListShape::new("items", "path").with_count_field("count"))
    }

    async fn execute(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, ToolError> {
        let items: Vec<Value> = self.paths.iter().map(|path| json!({ "path": path })).collect();
        Ok(json!({ "count": items.len(), "items": items }))
    }
}
