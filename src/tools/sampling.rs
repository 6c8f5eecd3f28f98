//! Sampling tool: asks the connected client's language model a question.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::mcp::context::InvocationContext;
use crate::mcp::handler::{
    get_optional_number_arg, get_string_arg, Arguments, ToolHandler, ToolOutput,
};
use crate::mcp::protocol::{
    CreateMessageParams, SamplingContent, SamplingMessage, Tool, ToolAnnotations,
};

const DEFAULT_MAX_TOKENS: u32 = 100;

/// Forwards a prompt to the client through `sampling/createMessage`.
pub struct AskLlmTool;

impl AskLlmTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AskLlmTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for AskLlmTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "ask_llm".to_string(),
            title: None,
            description: "Ask the connected LLM a question using sampling.".to_string(),
            input_schema: crate::tool_schema!(
                required: ["prompt"],
                "prompt": {
                    "type": "string",
                    "description": "The question or prompt for the LLM"
                },
                "max_tokens": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum tokens in response",
                    "default": DEFAULT_MAX_TOKENS
                }
            ),
            output_schema: None,
            annotations: Some(
                ToolAnnotations::with_title("Ask LLM")
                    .read_only(true)
                    .destructive(false)
                    .idempotent(false)
                    .open_world(false),
            ),
        }
    }

    async fn execute(&self, args: Arguments, ctx: &InvocationContext) -> Result<ToolOutput> {
        let prompt = get_string_arg(&args, "prompt")?;
        // Integral floats such as 3.0 pass the schema, so read as f64.
        let max_tokens = get_optional_number_arg(&args, "max_tokens")
            .map(|n| n as u32)
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let params = CreateMessageParams {
            messages: vec![SamplingMessage::user_text(prompt)],
            max_tokens,
            system_prompt: None,
        };

        let text = match ctx.peer().create_message(params).await {
            Ok(result) => match result.content {
                SamplingContent::Text { text } => format!("LLM Response: {}", text),
                _ => "LLM Response: [non-text response]".to_string(),
            },
            Err(e) => {
                debug!("Sampling failed: {}", e);
                format!("Sampling not supported or failed: {}", e)
            }
        };
        Ok(text.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mcp::context::test_context;
    use crate::mcp::dispatch::Dispatcher;
    use crate::mcp::protocol::{ClientCapabilities, JsonRpcResponse};
    use crate::mcp::registry::CapabilityRegistry;
    use crate::metrics::Metrics;
    use std::sync::Arc;
    use crate::mcp::transport::Message;
    use serde_json::json;

    fn prompt_args(prompt: &str) -> Arguments {
        let mut args = Arguments::new();
        args.insert("prompt".to_string(), json!(prompt));
        args
    }

    #[tokio::test]
    async fn test_without_client_support() {
        let (ctx, _rx) = test_context(None);
        let output = AskLlmTool::new()
            .execute(prompt_args("Why is the sky blue?"), &ctx)
            .await
            .unwrap();
        assert_eq!(
            output,
            ToolOutput::from("Sampling not supported or failed: Client does not support sampling")
        );
    }

    #[tokio::test]
    async fn test_forwards_prompt_to_client() {
        let (ctx, mut rx) = test_context(None);
        ctx.peer()
            .set_client_capabilities(ClientCapabilities {
                sampling: Some(json!({})),
                ..ClientCapabilities::default()
            })
            .await;

        let client = ctx.peer().clone();
        let answer = tokio::spawn(async move {
            let Some(Message::Request(req)) = rx.recv().await else {
                panic!("Expected a sampling request");
            };
            let params = req.params.clone().unwrap();
            assert_eq!(params["maxTokens"], 25);
            assert_eq!(params["messages"][0]["content"]["text"], "Why is the sky blue?");
            client.handle_response(JsonRpcResponse::success(
                req.id,
                json!({
                    "role": "assistant",
                    "content": {"type": "text", "text": "Rayleigh scattering."},
                    "model": "test-model"
                }),
            ));
        });

        let mut args = prompt_args("Why is the sky blue?");
        args.insert("max_tokens".to_string(), json!(25));
        let output = AskLlmTool::new().execute(args, &ctx).await.unwrap();

        answer.await.unwrap();
        assert_eq!(output, ToolOutput::from("LLM Response: Rayleigh scattering."));
    }

    #[tokio::test]
    async fn test_max_tokens_must_be_positive_integer() {
        let mut registry = CapabilityRegistry::new();
        registry.register_tool(AskLlmTool::new()).unwrap();
        let dispatcher = Dispatcher::new(Arc::new(registry), Metrics::new());
        let (ctx, _rx) = test_context(None);

        for bad in [json!(-5), json!(0), json!(2.5)] {
            let mut args = prompt_args("Hi");
            args.insert("max_tokens".to_string(), bad.clone());
            match dispatcher.call_tool("ask_llm", args, &ctx).await.into_result() {
                Err(Error::Validation { fields }) => assert_eq!(fields[0].field, "max_tokens"),
                other => panic!("Expected validation error for {}, got {:?}", bad, other.map(|_| ())),
            }
        }
    }

    #[tokio::test]
    async fn test_integral_float_max_tokens_is_honoured() {
        let (ctx, mut rx) = test_context(None);
        ctx.peer()
            .set_client_capabilities(ClientCapabilities {
                sampling: Some(json!({})),
                ..ClientCapabilities::default()
            })
            .await;

        let client = ctx.peer().clone();
        let answer = tokio::spawn(async move {
            let Some(Message::Request(req)) = rx.recv().await else {
                panic!("Expected a sampling request");
            };
            assert_eq!(req.params.clone().unwrap()["maxTokens"], 3);
            client.handle_response(JsonRpcResponse::success(
                req.id,
                json!({
                    "role": "assistant",
                    "content": {"type": "text", "text": "Short."},
                    "model": "test-model"
                }),
            ));
        });

        let mut args = prompt_args("Be brief");
        args.insert("max_tokens".to_string(), json!(3.0));
        let output = AskLlmTool::new().execute(args, &ctx).await.unwrap();

        answer.await.unwrap();
        assert_eq!(output, ToolOutput::from("LLM Response: Short."));
    }
}
