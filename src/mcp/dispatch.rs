//! Invocation of registered capabilities.
//!
//! Every tool call, resource read and prompt render goes through the same
//! lifecycle:
//!
//! ```text
//! Received -> Validating -> Validated -> Running -> Completed
//!                       \-> Rejected            \-> Failed
//! ```
//!
//! `Rejected` means the handler never ran (unknown capability or bad
//! arguments). `Failed` means it ran and raised, or was cancelled. Progress
//! notifications may be emitted while `Running`.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, FieldError, Result};
use crate::mcp::context::InvocationContext;
use crate::mcp::handler::{error_result, Arguments};
use crate::mcp::prompts::{GetPromptResult, PromptMessage};
use crate::mcp::protocol::{RequestId, ToolResult};
use crate::mcp::registry::{CapabilityKind, CapabilityRegistry};
use crate::mcp::resources::{
    resolve, ReadResourceResult, ResolvedResource, ResourceContents, ResourceOutput,
};
use crate::mcp::template::UriParams;
use crate::metrics::{Metrics, Timer};

/// State of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Received,
    Validating,
    Validated,
    Rejected,
    Running,
    Completed,
    Failed,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Failed)
    }
}

/// The terminal state of an invocation together with its result.
#[derive(Debug)]
pub struct Outcome<T> {
    pub state: InvocationState,
    pub result: Result<T>,
}

impl<T> Outcome<T> {
    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

/// Tracks one invocation through its states.
struct Invocation<'a> {
    kind: CapabilityKind,
    target: &'a str,
    request_id: &'a RequestId,
    state: InvocationState,
    timer: Timer,
}

impl<'a> Invocation<'a> {
    fn begin(kind: CapabilityKind, target: &'a str, ctx: &'a InvocationContext) -> Self {
        debug!(
            "Invocation {} ({} {}): {:?}",
            ctx.request_id(),
            kind,
            target,
            InvocationState::Received
        );
        Self {
            kind,
            target,
            request_id: ctx.request_id(),
            state: InvocationState::Received,
            timer: Timer::start(),
        }
    }

    fn advance(&mut self, next: InvocationState) {
        debug!(
            "Invocation {} ({} {}): {:?} -> {:?}",
            self.request_id, self.kind, self.target, self.state, next
        );
        self.state = next;
    }

    fn finish<T>(mut self, next: InvocationState, result: Result<T>) -> Outcome<T> {
        self.advance(next);
        debug!(
            "Invocation {} finished in {}ms",
            self.request_id,
            self.timer.elapsed_ms()
        );
        Outcome {
            state: self.state,
            result,
        }
    }
}

/// Run a handler future, abandoning it if the invocation is cancelled.
async fn run_cancellable<T, F>(ctx: &InvocationContext, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = ctx.cancellation_token().cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

/// Looks up capabilities and drives their invocations.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CapabilityRegistry>,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CapabilityRegistry>, metrics: Arc<Metrics>) -> Self {
        Self { registry, metrics }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Call a tool.
    ///
    /// Unknown tools and invalid arguments end `Rejected` with an error.
    /// A failing handler ends `Failed` but still yields a tool result with
    /// `isError` set, carrying the handler's message.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Arguments,
        ctx: &InvocationContext,
    ) -> Outcome<ToolResult> {
        self.metrics.inc_tool_calls();
        let mut invocation = Invocation::begin(CapabilityKind::Tool, name, ctx);

        invocation.advance(InvocationState::Validating);
        let entry = match self.registry.tool(name) {
            Ok(entry) if entry.handler.is_available() => entry,
            Ok(_) => {
                return invocation.finish(
                    InvocationState::Rejected,
                    Err(Error::not_found(CapabilityKind::Tool, name)),
                )
            }
            Err(e) => return invocation.finish(InvocationState::Rejected, Err(e)),
        };
        if let Err(e) = entry.validator.validate(&arguments) {
            self.metrics.inc_validation_rejections();
            return invocation.finish(InvocationState::Rejected, Err(e));
        }
        invocation.advance(InvocationState::Validated);

        invocation.advance(InvocationState::Running);
        let output = run_cancellable(ctx, entry.handler.execute(arguments, ctx)).await;

        match output.and_then(|output| output.into_result()) {
            Ok(result) => invocation.finish(InvocationState::Completed, Ok(result)),
            Err(Error::Cancelled) => {
                invocation.finish(InvocationState::Failed, Err(Error::Cancelled))
            }
            Err(e) => {
                let e = e.into_handler_error();
                warn!("Tool {} failed: {}", name, e);
                self.metrics.inc_tool_errors();
                invocation.finish(
                    InvocationState::Failed,
                    Ok(error_result(e.handler_message())),
                )
            }
        }
    }

    /// Read a resource by URI.
    pub async fn read_resource(
        &self,
        uri: &str,
        ctx: &InvocationContext,
    ) -> Outcome<ReadResourceResult> {
        self.metrics.inc_resource_reads();
        let mut invocation = Invocation::begin(CapabilityKind::Resource, uri, ctx);

        invocation.advance(InvocationState::Validating);
        let resolved = match resolve(&self.registry, uri) {
            Ok(resolved) => resolved,
            Err(e) => return invocation.finish(InvocationState::Rejected, Err(e)),
        };
        invocation.advance(InvocationState::Validated);

        let empty = UriParams::new();
        let (handler, params) = match &resolved {
            ResolvedResource::Static(entry) => (&entry.handler, &empty),
            ResolvedResource::Template { entry, params } => (&entry.handler, params),
        };

        invocation.advance(InvocationState::Running);
        let output = run_cancellable(ctx, handler.read(uri, params, ctx)).await;

        let contents = output.and_then(|output| match output {
            ResourceOutput::Text(text) => Ok(ResourceContents {
                uri: uri.to_string(),
                mime_type: Some(resolved.mime_type().unwrap_or("text/plain").to_string()),
                text,
            }),
            ResourceOutput::Json(value) => Ok(ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("application/json".to_string()),
                text: serde_json::to_string_pretty(&value)?,
            }),
        });

        match contents {
            Ok(contents) => invocation.finish(
                InvocationState::Completed,
                Ok(ReadResourceResult {
                    contents: vec![contents],
                }),
            ),
            Err(e @ (Error::Cancelled | Error::NotFound { .. })) => {
                invocation.finish(InvocationState::Failed, Err(e))
            }
            Err(e) => {
                warn!("Resource {} failed: {}", uri, e);
                invocation.finish(InvocationState::Failed, Err(e.into_handler_error()))
            }
        }
    }

    /// Render a prompt.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
        ctx: &InvocationContext,
    ) -> Outcome<GetPromptResult> {
        self.metrics.inc_prompt_gets();
        let mut invocation = Invocation::begin(CapabilityKind::Prompt, name, ctx);

        invocation.advance(InvocationState::Validating);
        let entry = match self.registry.prompt(name) {
            Ok(entry) => entry,
            Err(e) => return invocation.finish(InvocationState::Rejected, Err(e)),
        };
        let missing = entry.definition.missing_arguments(&arguments);
        if !missing.is_empty() {
            self.metrics.inc_validation_rejections();
            let fields = missing
                .into_iter()
                .map(|name| FieldError::new(name, "is required"))
                .collect();
            return invocation.finish(InvocationState::Rejected, Err(Error::Validation { fields }));
        }
        invocation.advance(InvocationState::Validated);

        invocation.advance(InvocationState::Running);
        match run_cancellable(ctx, entry.handler.render(&arguments, ctx)).await {
            Ok(text) => invocation.finish(
                InvocationState::Completed,
                Ok(GetPromptResult {
                    description: entry.definition.description.clone(),
                    messages: vec![PromptMessage::user_text(text)],
                }),
            ),
            Err(Error::Cancelled) => {
                invocation.finish(InvocationState::Failed, Err(Error::Cancelled))
            }
            Err(e) => {
                warn!("Prompt {} failed: {}", name, e);
                invocation.finish(InvocationState::Failed, Err(e.into_handler_error()))
            }
        }
    }

    /// Completion values for a prompt argument, filtered by prefix.
    pub fn complete_prompt(&self, name: &str, argument: &str, prefix: &str) -> Result<Vec<String>> {
        let entry = self.registry.prompt(name)?;
        Ok(entry.handler.complete(argument, prefix))
    }

    /// Completion values for a resource template parameter, filtered by prefix.
    pub fn complete_resource(&self, uri: &str, param: &str, prefix: &str) -> Result<Vec<String>> {
        let entry = self.registry.template(uri)?;
        Ok(entry.handler.complete(param, prefix))
    }
}

/// Parse JSON params into a typed struct, mapping failures to `InvalidParams`.
pub fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T> {
    let params = params.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(params).map_err(|e| Error::InvalidParams(e.to_string()))
}
