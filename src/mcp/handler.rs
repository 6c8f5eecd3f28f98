//! Capability handler traits and argument helpers.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mcp::context::InvocationContext;
use crate::mcp::prompts::Prompt;
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};
use crate::mcp::resources::ResourceOutput;
use crate::mcp::template::UriParams;

/// Arguments of a tool call.
pub type Arguments = HashMap<String, Value>;

/// Handler for MCP tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Whether the tool is currently offered to clients.
    fn is_available(&self) -> bool {
        true
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: Arguments, ctx: &InvocationContext) -> Result<ToolOutput>;
}

/// Handler for a static resource or a resource template.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Read the resource. `params` holds the values extracted from a template
    /// match and is empty for static resources.
    async fn read(
        &self,
        uri: &str,
        params: &UriParams,
        ctx: &InvocationContext,
    ) -> Result<ResourceOutput>;

    /// Suggest values for a template parameter.
    fn complete(&self, _param: &str, _prefix: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Handler for prompts.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    /// Get the prompt definition.
    fn definition(&self) -> Prompt;

    /// Render the prompt text for the given arguments.
    async fn render(
        &self,
        arguments: &HashMap<String, String>,
        ctx: &InvocationContext,
    ) -> Result<String>;

    /// Suggest values for a prompt argument.
    fn complete(&self, _argument: &str, _prefix: &str) -> Vec<String> {
        Vec::new()
    }
}

/// What a tool handler returns before it is adapted into a `ToolResult`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Structured(Value),
}

impl ToolOutput {
    /// Adapt the output into the wire result.
    pub fn into_result(self) -> Result<ToolResult> {
        match self {
            Self::Text(text) => Ok(success_result(text)),
            Self::Structured(value) => Ok(ToolResult {
                content: vec![text_content(serde_json::to_string_pretty(&value)?)],
                structured_content: Some(value),
                is_error: false,
            }),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

/// Helper macro for creating tool input schemas.
#[macro_export]
macro_rules! tool_schema {
    () => {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    };
    (required: [$($req:literal),* $(,)?], $($json:tt)+) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $($json)+
            },
            "required": [$($req),*]
        })
    };
    ($($json:tt)+) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $($json)+
            }
        })
    };
}

/// Helper to create a text content block.
pub fn text_content(text: impl Into<String>) -> ContentBlock {
    ContentBlock::Text { text: text.into() }
}

/// Helper to create a successful tool result.
pub fn success_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        structured_content: None,
        is_error: false,
    }
}

/// Helper to create an error tool result.
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        structured_content: None,
        is_error: true,
    }
}

/// Helper to extract a required string argument.
pub fn get_string_arg(args: &Arguments, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| Error::invalid_field(name, "missing required string"))
}

/// Helper to extract an optional string argument.
pub fn get_optional_string_arg(args: &Arguments, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(String::from)
}

/// Helper to extract an optional number argument.
pub fn get_optional_number_arg(args: &Arguments, name: &str) -> Option<f64> {
    args.get(name).and_then(|v| v.as_f64())
}

/// Helper to extract a required number argument.
pub fn get_number_arg(args: &Arguments, name: &str) -> Result<f64> {
    args.get(name)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| Error::invalid_field(name, "missing required number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_schema_macro() {
        let empty = crate::tool_schema!();
        assert_eq!(empty["type"], "object");
        assert!(empty["properties"].as_object().unwrap().is_empty());

        let schema = crate::tool_schema!(
            required: ["name"],
            "name": { "type": "string" },
            "count": { "type": "integer" }
        );
        assert_eq!(schema["required"], json!(["name"]));
        assert_eq!(schema["properties"]["count"]["type"], "integer");

        let optional = crate::tool_schema!("topic": { "type": "string" });
        assert!(optional.get("required").is_none());
    }

    #[test]
    fn test_text_output_adaptation() {
        let result = ToolOutput::from("Hello").into_result().unwrap();
        assert!(!result.is_error);
        assert!(result.structured_content.is_none());
        assert_eq!(result.first_text(), Some("Hello"));
    }

    #[test]
    fn test_structured_output_adaptation() {
        let value = json!({"location": "Paris", "temperature": 21});
        let result = ToolOutput::from(value.clone()).into_result().unwrap();

        assert_eq!(result.structured_content, Some(value.clone()));
        let text = result.first_text().unwrap();
        let reparsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(reparsed, value);
    }

    #[test]
    fn test_get_string_arg() {
        let mut args = Arguments::new();
        args.insert("name".to_string(), json!("value"));

        assert_eq!(get_string_arg(&args, "name").unwrap(), "value");
        assert!(matches!(
            get_string_arg(&args, "missing"),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_get_optional_args() {
        let mut args = Arguments::new();
        args.insert("name".to_string(), json!("value"));
        args.insert("count".to_string(), json!(42));

        assert_eq!(
            get_optional_string_arg(&args, "name"),
            Some("value".to_string())
        );
        assert_eq!(get_optional_string_arg(&args, "missing"), None);
        assert_eq!(get_optional_number_arg(&args, "count"), Some(42.0));
        assert_eq!(get_optional_number_arg(&args, "name"), None);
    }

    #[test]
    fn test_get_number_arg() {
        let mut args = Arguments::new();
        args.insert("a".to_string(), json!(2.5));
        args.insert("b".to_string(), json!(3));

        assert_eq!(get_number_arg(&args, "a").unwrap(), 2.5);
        assert_eq!(get_number_arg(&args, "b").unwrap(), 3.0);
        assert!(get_number_arg(&args, "c").is_err());
    }

    #[test]
    fn test_error_result() {
        let result = error_result("Error!");
        assert!(result.is_error);
        assert_eq!(result.content.len(), 1);
    }
}
