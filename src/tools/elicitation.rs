//! Elicitation tools: ask the user for input while a tool is running.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::mcp::context::InvocationContext;
use crate::mcp::handler::{
    get_optional_string_arg, get_string_arg, Arguments, ToolHandler, ToolOutput,
};
use crate::mcp::protocol::{ElicitAction, ElicitParams, Tool, ToolAnnotations};

/// Where `get_feedback` sends the user.
pub const FEEDBACK_URL: &str =
    "https://github.com/SamMorrowDrums/mcp-starters/issues/new?template=workshop-feedback.yml";

/// Requests confirmation through a form before "performing" an action.
pub struct ConfirmActionTool;

impl ConfirmActionTool {
    pub fn new() -> Self {
        Self
    }

    fn requested_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "confirm": {
                    "type": "boolean",
                    "title": "Confirm",
                    "description": "Confirm the action"
                },
                "reason": {
                    "type": "string",
                    "title": "Reason",
                    "description": "Optional reason for your choice"
                }
            },
            "required": ["confirm"]
        })
    }
}

impl Default for ConfirmActionTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for ConfirmActionTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "confirm_action".to_string(),
            title: None,
            description:
                "Demonstrates elicitation - requests user confirmation before proceeding."
                    .to_string(),
            input_schema: crate::tool_schema!(
                required: ["action"],
                "action": {
                    "type": "string",
                    "description": "The action to confirm with the user"
                }
            ),
            output_schema: None,
            annotations: Some(
                ToolAnnotations::with_title("Confirm Action")
                    .read_only(true)
                    .destructive(false)
                    .idempotent(false)
                    .open_world(false),
            ),
        }
    }

    async fn execute(&self, args: Arguments, ctx: &InvocationContext) -> Result<ToolOutput> {
        let action = get_string_arg(&args, "action")?;
        let params = ElicitParams::Form {
            message: format!("Please confirm: {}", action),
            requested_schema: Self::requested_schema(),
        };

        let result = match ctx.peer().elicit(params).await {
            Ok(result) => result,
            Err(e) => return Ok(format!("Elicitation not supported or failed: {}", e).into()),
        };

        let text = match result.action {
            ElicitAction::Accept => {
                let content = result.content.unwrap_or_default();
                let confirmed = content
                    .get("confirm")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if confirmed {
                    let reason = content
                        .get("reason")
                        .and_then(Value::as_str)
                        .unwrap_or("No reason provided");
                    format!("Action confirmed: {}\nReason: {}", action, reason)
                } else {
                    format!("Action declined by user: {}", action)
                }
            }
            ElicitAction::Decline => format!("User declined to respond for: {}", action),
            ElicitAction::Cancel => format!("User cancelled elicitation for: {}", action),
        };
        Ok(text.into())
    }
}

/// Opens the workshop feedback form through URL elicitation.
pub struct GetFeedbackTool;

impl GetFeedbackTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GetFeedbackTool {
    fn default() -> Self {
        Self::new()
    }
}

/// The feedback form URL, with the topic as the issue title when given.
pub fn feedback_url(topic: &str) -> String {
    if topic.is_empty() {
        FEEDBACK_URL.to_string()
    } else {
        format!(
            "{}&title={}",
            FEEDBACK_URL,
            utf8_percent_encode(topic, NON_ALPHANUMERIC)
        )
    }
}

#[async_trait]
impl ToolHandler for GetFeedbackTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_feedback".to_string(),
            title: None,
            description:
                "Demonstrates URL elicitation - opens a feedback form in the browser.".to_string(),
            input_schema: crate::tool_schema!(
                "topic": {
                    "type": "string",
                    "description": "Optional topic for the feedback",
                    "default": ""
                }
            ),
            output_schema: None,
            // Opens an external URL.
            annotations: Some(
                ToolAnnotations::with_title("Get Feedback")
                    .read_only(true)
                    .destructive(false)
                    .idempotent(false)
                    .open_world(true),
            ),
        }
    }

    async fn execute(&self, args: Arguments, ctx: &InvocationContext) -> Result<ToolOutput> {
        let topic = get_optional_string_arg(&args, "topic").unwrap_or_default();
        let url = feedback_url(&topic);

        let params = ElicitParams::Url {
            message: "Please provide feedback on MCP Starters by completing the form at the URL below:"
                .to_string(),
            url: url.clone(),
            elicitation_id: Uuid::new_v4().to_string(),
        };

        let text = match ctx.peer().elicit(params).await {
            Ok(result) => match result.action {
                ElicitAction::Accept => {
                    "Thank you for providing feedback! Your input helps improve MCP Starters."
                        .to_string()
                }
                ElicitAction::Decline => {
                    format!("No problem! Feel free to provide feedback anytime at: {}", url)
                }
                ElicitAction::Cancel => "Feedback request cancelled.".to_string(),
            },
            Err(e) => format!(
                "URL elicitation not supported or failed: {}\n\nYou can still provide feedback at: {}",
                e, url
            ),
        };
        Ok(text.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::context::test_context;
    use crate::mcp::peer::Peer;
    use crate::mcp::protocol::{ClientCapabilities, JsonRpcResponse};
    use crate::mcp::transport::Message;
    use tokio::sync::mpsc::Receiver;

    async fn enable_elicitation(peer: &Peer) {
        peer.set_client_capabilities(ClientCapabilities {
            elicitation: Some(json!({})),
            ..ClientCapabilities::default()
        })
        .await;
    }

    /// Answer the next elicitation request with `result`, returning its params.
    fn answer_with(
        peer: &Peer,
        mut rx: Receiver<Message>,
        result: Value,
    ) -> tokio::task::JoinHandle<Value> {
        let client = peer.clone();
        tokio::spawn(async move {
            let Some(Message::Request(req)) = rx.recv().await else {
                panic!("Expected an elicitation request");
            };
            assert_eq!(req.method, "elicitation/create");
            let params = req.params.clone().unwrap_or(Value::Null);
            client.handle_response(JsonRpcResponse::success(req.id, result));
            params
        })
    }

    fn action_args(action: &str) -> Arguments {
        let mut args = Arguments::new();
        args.insert("action".to_string(), json!(action));
        args
    }

    #[tokio::test]
    async fn test_confirm_accepted_with_reason() {
        let (ctx, rx) = test_context(None);
        enable_elicitation(ctx.peer()).await;
        let client = answer_with(
            ctx.peer(),
            rx,
            json!({"action": "accept", "content": {"confirm": true, "reason": "tested"}}),
        );

        let output = ConfirmActionTool::new()
            .execute(action_args("deploy"), &ctx)
            .await
            .unwrap();

        let params = client.await.unwrap();
        assert_eq!(params["mode"], "form");
        assert_eq!(params["message"], "Please confirm: deploy");
        assert_eq!(params["requestedSchema"]["required"], json!(["confirm"]));
        assert_eq!(output, ToolOutput::from("Action confirmed: deploy\nReason: tested"));
    }

    #[tokio::test]
    async fn test_confirm_outcomes() {
        let cases = [
            (
                json!({"action": "accept", "content": {"confirm": true}}),
                "Action confirmed: deploy\nReason: No reason provided",
            ),
            (
                json!({"action": "accept", "content": {"confirm": false}}),
                "Action declined by user: deploy",
            ),
            (json!({"action": "decline"}), "User declined to respond for: deploy"),
            (json!({"action": "cancel"}), "User cancelled elicitation for: deploy"),
        ];

        for (answer, expected) in cases {
            let (ctx, rx) = test_context(None);
            enable_elicitation(ctx.peer()).await;
            let client = answer_with(ctx.peer(), rx, answer);

            let output = ConfirmActionTool::new()
                .execute(action_args("deploy"), &ctx)
                .await
                .unwrap();
            client.await.unwrap();
            assert_eq!(output, ToolOutput::from(expected));
        }
    }

    #[tokio::test]
    async fn test_confirm_without_client_support() {
        let (ctx, _rx) = test_context(None);
        let output = ConfirmActionTool::new()
            .execute(action_args("deploy"), &ctx)
            .await
            .unwrap();
        assert_eq!(
            output,
            ToolOutput::from(
                "Elicitation not supported or failed: Client does not support elicitation"
            )
        );
    }

    #[test]
    fn test_feedback_url() {
        assert_eq!(feedback_url(""), FEEDBACK_URL);
        assert_eq!(
            feedback_url("Great workshop"),
            format!("{}&title=Great%20workshop", FEEDBACK_URL)
        );
    }

    #[tokio::test]
    async fn test_feedback_sends_url_elicitation() {
        let (ctx, rx) = test_context(None);
        enable_elicitation(ctx.peer()).await;
        let client = answer_with(ctx.peer(), rx, json!({"action": "decline"}));

        let output = GetFeedbackTool::new()
            .execute(Arguments::new(), &ctx)
            .await
            .unwrap();

        let params = client.await.unwrap();
        assert_eq!(params["mode"], "url");
        assert_eq!(params["url"], FEEDBACK_URL);
        assert!(Uuid::parse_str(params["elicitationId"].as_str().unwrap()).is_ok());
        assert_eq!(
            output,
            ToolOutput::from(format!(
                "No problem! Feel free to provide feedback anytime at: {}",
                FEEDBACK_URL
            ))
        );
    }

    #[tokio::test]
    async fn test_feedback_without_client_support() {
        let (ctx, _rx) = test_context(None);
        let output = GetFeedbackTool::new()
            .execute(Arguments::new(), &ctx)
            .await
            .unwrap();
        let ToolOutput::Text(text) = output else {
            panic!("Expected text output");
        };
        assert!(text.starts_with("URL elicitation not supported or failed: "));
        assert!(text.ends_with(&format!("You can still provide feedback at: {}", FEEDBACK_URL)));
    }
}
