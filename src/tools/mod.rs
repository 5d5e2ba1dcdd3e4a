//! Tools exposed to agents through function calling.
//!
//! Every tool takes a JSON argument object and returns text. Failures never
//! leave [`ToolBox::execute`]: they come back to the model as a tool message
//! starting with `Error:`.

mod math;
mod python;
mod search;
mod sql;

pub use math::{db_connect, triple_number, DbConnectTool, TripleNumberTool};
pub use python::{ArtifactTracker, PythonReplTool, PythonSandbox};
pub use search::WebSearchTool;
pub use sql::{
    is_read_only_statement, sql_toolkit, SqlDatabase, SqlListTablesTool, SqlQueryCheckerTool,
    SqlQueryTool, SqlSchemaTool,
};

use crate::error::{AgentGraphError, Result};
use crate::message::{Message, ToolCall};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Function definition advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object.
    pub parameters: Value,
}

/// A callable the model can request.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the argument object.
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value) -> Result<String>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Ordered set of tools bound to one agent.
#[derive(Clone, Default)]
pub struct ToolBox {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Lookups return the first tool registered under a name.
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn with_shared(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Definitions for the model request, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Run one requested call and wrap the outcome as a tool message.
    pub async fn execute(&self, call: &ToolCall) -> Message {
        info!("Agent calling tool: {} with args: {}", call.name, call.arguments);

        let content = match self.try_execute(call).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool {} failed: {}", call.name, e);
                format!("Error: {}", e)
            }
        };

        debug!("Tool {} returned {} chars", call.name, content.len());
        Message::tool(call.id.clone(), call.name.clone(), content)
    }

    async fn try_execute(&self, call: &ToolCall) -> Result<String> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentGraphError::UnknownTool(call.name.clone()))?;

        let args = parse_arguments(&call.arguments)?;
        tool.call(args).await
    }
}

/// Parse the raw argument string; an empty string means no arguments.
pub fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AgentGraphError::Tool(format!("Invalid tool arguments: {}", e)))?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(AgentGraphError::Tool(format!(
            "Tool arguments must be a JSON object, got: {}",
            raw
        )))
    }
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args[key]
        .as_str()
        .ok_or_else(|| AgentGraphError::Tool(format!("Missing '{}' argument", key)))
}

/// Fetch a required integer argument; numeric strings are accepted.
pub(crate) fn required_number(args: &Value, key: &str) -> Result<i64> {
    match &args[key] {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| AgentGraphError::Tool(format!("'{}' must be an integer, got {}", key, n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| AgentGraphError::Tool(format!("'{}' must be an integer, got \"{}\"", key, s))),
        Value::Null => Err(AgentGraphError::Tool(format!("Missing '{}' argument", key))),
        other => Err(AgentGraphError::Tool(format!("'{}' must be an integer, got {}", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_runs_registered_tool() {
        let tools = ToolBox::new().with(TripleNumberTool).with(DbConnectTool);
        let msg = tools
            .execute(&ToolCall::new("c1", "triple_number", r#"{"number": 15}"#))
            .await;

        assert_eq!(msg.content, "45");
        assert_eq!(msg.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(msg.name.as_deref(), Some("triple_number"));
    }

    #[tokio::test]
    async fn test_execute_never_fails() {
        let tools = ToolBox::new().with(TripleNumberTool);

        let unknown = tools.execute(&ToolCall::new("c1", "launch", "{}")).await;
        assert!(unknown.content.starts_with("Error: Unknown tool: launch"));

        let bad_json = tools.execute(&ToolCall::new("c2", "triple_number", "{not json")).await;
        assert!(bad_json.content.starts_with("Error:"));

        let missing_arg = tools.execute(&ToolCall::new("c3", "triple_number", "{}")).await;
        assert!(missing_arg.content.starts_with("Error:"));
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments("").unwrap().is_object());
        assert_eq!(parse_arguments(r#"{"a": 1}"#).unwrap()["a"], 1);
        assert!(parse_arguments("[1, 2]").is_err());
    }

    #[test]
    fn test_specs_in_order() {
        let tools = ToolBox::new().with(DbConnectTool).with(TripleNumberTool);
        let names: Vec<_> = tools.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["db_connect", "triple_number"]);
        assert_eq!(tools.names(), vec!["db_connect", "triple_number"]);
    }
}
