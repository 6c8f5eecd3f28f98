//! MCP server implementation.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::mcp::context::InvocationContext;
use crate::mcp::dispatch::{parse_params, Dispatcher};
use crate::mcp::peer::Peer;
use crate::mcp::prompts::{GetPromptParams, ListPromptsResult};
use crate::mcp::protocol::*;
use crate::mcp::registry::CapabilityRegistry;
use crate::mcp::resources::{
    ListResourceTemplatesResult, ListResourcesResult, ReadResourceParams,
};
use crate::mcp::transport::{Message, Transport};
use crate::metrics::Metrics;
use crate::VERSION;

/// State of one client connection.
#[derive(Clone)]
pub struct Session {
    peer: Peer,
    /// Cancellation tokens of in-flight requests.
    active_requests: Arc<RwLock<HashMap<RequestId, CancellationToken>>>,
}

impl Session {
    pub fn new(peer: Peer) -> Self {
        Self {
            peer,
            active_requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    /// Start tracking request `id`, returning the token that cancels it.
    ///
    /// Fails if a request with the same id is still in flight.
    pub async fn track(&self, id: &RequestId) -> Result<CancellationToken> {
        let mut active = self.active_requests.write().await;
        if active.contains_key(id) {
            return Err(Error::InvalidRequest(format!(
                "request id {} is already in flight",
                id
            )));
        }
        let token = CancellationToken::new();
        active.insert(id.clone(), token.clone());
        Ok(token)
    }

    async fn untrack(&self, id: &RequestId) {
        self.active_requests.write().await.remove(id);
    }

    /// Cancel an in-flight request. Returns `false` if it was not running.
    pub async fn cancel(&self, id: &RequestId) -> bool {
        match self.active_requests.read().await.get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of requests currently being handled.
    pub async fn in_flight(&self) -> usize {
        self.active_requests.read().await.len()
    }
}

/// MCP server.
#[derive(Clone)]
pub struct McpServer {
    registry: Arc<CapabilityRegistry>,
    dispatcher: Dispatcher,
    metrics: Arc<Metrics>,
    name: String,
    version: String,
    instructions: Option<String>,
}

impl McpServer {
    /// Create a new MCP server over a fully built registry.
    pub fn new(
        registry: CapabilityRegistry,
        metrics: Arc<Metrics>,
        name: impl Into<String>,
    ) -> Self {
        let registry = Arc::new(registry);
        Self {
            dispatcher: Dispatcher::new(registry.clone(), metrics.clone()),
            registry,
            metrics,
            name: name.into(),
            version: VERSION.to_string(),
            instructions: None,
        }
    }

    /// Set the instructions returned from `initialize`.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Run the server with the given transport until the client goes away.
    ///
    /// Each request runs in its own task so a handler waiting on the client
    /// (sampling, elicitation) never blocks the reader that delivers the
    /// client's answer.
    pub async fn run<T: Transport>(&self, mut transport: T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.name, self.version);

        let (mut incoming, outgoing) = transport.start().await?;
        let session = Session::new(Peer::new(outgoing.clone()));
        let mut tasks = JoinSet::new();

        while let Some(msg) = incoming.recv().await {
            match msg {
                Message::Request(req) => {
                    // Tracked before spawning so a cancellation read right
                    // after the request still finds it.
                    let cancel = match session.track(&req.id).await {
                        Ok(cancel) => cancel,
                        Err(e) => {
                            warn!("Rejecting request {}: {}", req.id, e);
                            let response = JsonRpcResponse::failure(req.id, JsonRpcError::from(&e));
                            if outgoing.send(Message::Response(response)).await.is_err() {
                                error!("Failed to send response");
                            }
                            continue;
                        }
                    };
                    let server = self.clone();
                    let session = session.clone();
                    let outgoing = outgoing.clone();
                    tasks.spawn(async move {
                        if let Some(response) = server.handle_tracked(&session, req, cancel).await
                        {
                            if outgoing.send(Message::Response(response)).await.is_err() {
                                error!("Failed to send response");
                            }
                        }
                    });
                }
                Message::Notification(notif) => {
                    self.handle_notification(&session, notif).await;
                }
                Message::Response(resp) => {
                    session.peer().handle_response(resp);
                }
            }

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    error!("Request task failed: {}", e);
                }
            }
        }

        // The client can no longer answer, so anything waiting on it fails;
        // requests already received still get their responses.
        debug!("Input closed, draining {} request(s)", tasks.len());
        session.peer().close();
        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                error!("Request task failed: {}", e);
            }
        }

        drop(session);
        drop(outgoing);
        transport.stop().await?;
        info!("MCP server stopped");
        Ok(())
    }

    /// Handle a JSON-RPC request.
    ///
    /// Returns `None` when the request was cancelled; a cancelled request
    /// gets no response.
    pub async fn handle_request(
        &self,
        session: &Session,
        req: JsonRpcRequest,
    ) -> Option<JsonRpcResponse> {
        match session.track(&req.id).await {
            Ok(cancel) => self.handle_tracked(session, req, cancel).await,
            Err(e) => Some(JsonRpcResponse::failure(req.id, JsonRpcError::from(&e))),
        }
    }

    /// Handle a request already registered with [`Session::track`].
    pub async fn handle_tracked(
        &self,
        session: &Session,
        req: JsonRpcRequest,
        cancel: CancellationToken,
    ) -> Option<JsonRpcResponse> {
        debug!("Handling request: {} (id: {})", req.method, req.id);
        self.metrics.inc_requests();

        let result = self
            .route(session, &req.id, &req.method, req.params, cancel.clone())
            .await;

        session.untrack(&req.id).await;

        match result {
            _ if cancel.is_cancelled() => {
                info!("Request {} cancelled", req.id);
                self.metrics.inc_cancellations();
                None
            }
            Err(Error::Cancelled) => {
                self.metrics.inc_cancellations();
                None
            }
            Ok(value) => {
                self.metrics.inc_success();
                Some(JsonRpcResponse::success(req.id, value))
            }
            Err(e) => {
                debug!("Request {} failed: {}", req.id, e);
                self.metrics.inc_failed();
                Some(JsonRpcResponse::failure(req.id, JsonRpcError::from(&e)))
            }
        }
    }

    async fn route(
        &self,
        session: &Session,
        id: &RequestId,
        method: &str,
        params: Option<Value>,
        cancel: CancellationToken,
    ) -> Result<Value> {
        let context = || {
            InvocationContext::new(id.clone(), session.peer().clone())
                .with_cancellation(cancel.clone())
        };

        match method {
            // Core
            "initialize" => self.handle_initialize(session, params).await,
            "ping" => Ok(json!({})),
            // Tools
            "tools/list" => Ok(serde_json::to_value(ListToolsResult {
                tools: self.registry.list_tools(),
            })?),
            "tools/call" => {
                let params: CallToolParams = parse_params(params)?;
                let token = params.meta.and_then(|meta| meta.progress_token);
                let ctx = context().with_progress_token(token);
                let result = self
                    .dispatcher
                    .call_tool(&params.name, params.arguments, &ctx)
                    .await
                    .into_result()?;
                Ok(serde_json::to_value(result)?)
            }
            // Resources
            "resources/list" => Ok(serde_json::to_value(ListResourcesResult {
                resources: self
                    .registry
                    .resources()
                    .map(|entry| entry.definition.clone())
                    .collect(),
                next_cursor: None,
            })?),
            "resources/templates/list" => Ok(serde_json::to_value(ListResourceTemplatesResult {
                resource_templates: self
                    .registry
                    .templates()
                    .map(|entry| entry.definition.clone())
                    .collect(),
                next_cursor: None,
            })?),
            "resources/read" => {
                let params: ReadResourceParams = parse_params(params)?;
                let result = self
                    .dispatcher
                    .read_resource(&params.uri, &context())
                    .await
                    .into_result()?;
                Ok(serde_json::to_value(result)?)
            }
            // Prompts
            "prompts/list" => Ok(serde_json::to_value(ListPromptsResult {
                prompts: self
                    .registry
                    .prompts()
                    .map(|entry| entry.definition.clone())
                    .collect(),
                next_cursor: None,
            })?),
            "prompts/get" => {
                let params: GetPromptParams = parse_params(params)?;
                let result = self
                    .dispatcher
                    .get_prompt(&params.name, params.arguments, &context())
                    .await
                    .into_result()?;
                Ok(serde_json::to_value(result)?)
            }
            // Completions
            "completion/complete" => self.handle_completion(params),
            // Logging
            "logging/setLevel" => {
                #[derive(serde::Deserialize)]
                struct SetLevelParams {
                    level: LoggingLevel,
                }

                let params: SetLevelParams = parse_params(params)?;
                info!("Client log level set to {:?}", params.level);
                session.peer().set_log_level(params.level).await;
                Ok(json!({}))
            }
            // Unknown
            _ => Err(Error::MethodNotFound(method.to_string())),
        }
    }

    /// Handle a notification.
    pub async fn handle_notification(&self, session: &Session, notif: JsonRpcNotification) {
        debug!("Handling notification: {}", notif.method);

        match notif.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                #[derive(serde::Deserialize)]
                struct CancelledParams {
                    #[serde(rename = "requestId")]
                    request_id: RequestId,
                    #[serde(default)]
                    reason: Option<String>,
                }

                match parse_params::<CancelledParams>(notif.params) {
                    Ok(cancel) => {
                        info!(
                            "Cancelling request {}: {}",
                            cancel.request_id,
                            cancel.reason.as_deref().unwrap_or("no reason given")
                        );
                        if !session.cancel(&cancel.request_id).await {
                            debug!("Request {} is not in flight", cancel.request_id);
                        }
                    }
                    Err(e) => warn!("Ignoring malformed cancellation: {}", e),
                }
            }
            "notifications/roots/list_changed" => {
                info!("Client roots changed");
            }
            _ => {
                debug!("Unknown notification: {}", notif.method);
            }
        }
    }

    /// Handle initialize request.
    async fn handle_initialize(&self, session: &Session, params: Option<Value>) -> Result<Value> {
        let params: InitializeParams = match params {
            Some(params) => parse_params(Some(params))?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            info!("Client connected: {} v{}", client.name, client.version);
        }
        session
            .peer()
            .set_client_capabilities(params.capabilities)
            .await;

        let result = InitializeResult {
            protocol_version: negotiate_version(params.protocol_version.as_deref()).to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: true }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
                prompts: Some(PromptsCapability {
                    list_changed: false,
                }),
                logging: Some(EmptyCapability {}),
                completions: Some(EmptyCapability {}),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
            instructions: self.instructions.clone(),
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle completion request.
    fn handle_completion(&self, params: Option<Value>) -> Result<Value> {
        let params: CompleteParams = parse_params(params)?;
        let argument = &params.argument;

        let values = match &params.reference {
            CompletionRef::Prompt { name } => {
                self.dispatcher
                    .complete_prompt(name, &argument.name, &argument.value)?
            }
            CompletionRef::Resource { uri } => {
                self.dispatcher
                    .complete_resource(uri, &argument.name, &argument.value)?
            }
        };

        Ok(serde_json::to_value(CompleteResult::from_values(values))?)
    }
}
