//! The connected client, seen from the server.
//!
//! A `Peer` sends notifications and server-initiated requests (sampling,
//! elicitation) over the session's outgoing channel, and routes responses
//! to those requests back to the waiting caller.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mcp::protocol::{
    ClientCapabilities, CreateMessageParams, CreateMessageResult, ElicitParams, ElicitResult,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, LoggingLevel, RequestId,
};
use crate::mcp::transport::Message;

type Pending = Mutex<HashMap<RequestId, oneshot::Sender<JsonRpcResponse>>>;

struct PeerState {
    pending: Pending,
    next_id: AtomicI64,
    capabilities: RwLock<ClientCapabilities>,
    log_level: RwLock<LoggingLevel>,
    server_requests: bool,
    closed: AtomicBool,
}

/// Handle to the client at the other end of a session.
#[derive(Clone)]
pub struct Peer {
    outgoing: mpsc::Sender<Message>,
    state: Arc<PeerState>,
}

impl Peer {
    /// Create a peer that can send both notifications and requests.
    pub fn new(outgoing: mpsc::Sender<Message>) -> Self {
        Self::build(outgoing, true)
    }

    /// Create a peer that can only send notifications.
    ///
    /// Used where the transport has no way to carry a client's answer back,
    /// such as a single HTTP request/response exchange.
    pub fn notifications_only(outgoing: mpsc::Sender<Message>) -> Self {
        Self::build(outgoing, false)
    }

    fn build(outgoing: mpsc::Sender<Message>, server_requests: bool) -> Self {
        Self {
            outgoing,
            state: Arc::new(PeerState {
                pending: Mutex::new(HashMap::new()),
                next_id: AtomicI64::new(1),
                capabilities: RwLock::new(ClientCapabilities::default()),
                log_level: RwLock::new(LoggingLevel::Debug),
                server_requests,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Record what the client declared in `initialize`.
    pub async fn set_client_capabilities(&self, capabilities: ClientCapabilities) {
        *self.state.capabilities.write().await = capabilities;
    }

    /// Capabilities declared by the client.
    pub async fn client_capabilities(&self) -> ClientCapabilities {
        self.state.capabilities.read().await.clone()
    }

    /// Set the minimum level for `notifications/message`.
    pub async fn set_log_level(&self, level: LoggingLevel) {
        *self.state.log_level.write().await = level;
    }

    /// Send a notification. Delivery failures are logged and dropped.
    pub async fn notify(&self, method: &str, params: impl Serialize) {
        let params = match serde_json::to_value(params) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize {} params: {}", method, e);
                return;
            }
        };
        let notification = JsonRpcNotification::new(method, Some(params));
        if self
            .outgoing
            .send(Message::Notification(notification))
            .await
            .is_err()
        {
            debug!("Dropped {} notification: session closed", method);
        }
    }

    /// Send a log message to the client if it passes the configured level.
    pub async fn log(&self, level: LoggingLevel, logger: &str, data: impl Into<Value>) {
        if level < *self.state.log_level.read().await {
            return;
        }
        self.notify(
            "notifications/message",
            json!({ "level": level, "logger": logger, "data": data.into() }),
        )
        .await;
    }

    /// Tell the client the set of offered tools changed.
    pub async fn notify_tool_list_changed(&self) {
        self.notify("notifications/tools/list_changed", json!({}))
            .await;
    }

    /// Send a request to the client and wait for its answer.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        if !self.state.server_requests {
            return Err(Error::Unsupported(format!(
                "{} on this transport",
                method
            )));
        }

        let id = RequestId::String(format!(
            "srv-{}",
            self.state.next_id.fetch_add(1, Ordering::SeqCst)
        ));
        let (tx, rx) = oneshot::channel();
        self.pending()?.insert(id.clone(), tx);
        let guard = PendingGuard {
            state: &self.state,
            id: id.clone(),
        };
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }

        debug!("Sending {} request to client (id: {})", method, id);
        let request = JsonRpcRequest::new(id, method, Some(params));
        if self.outgoing.send(Message::Request(request)).await.is_err() {
            return Err(Error::ConnectionClosed);
        }

        let response = rx.await.map_err(|_| Error::ConnectionClosed)?;
        drop(guard);

        if let Some(error) = response.error {
            return Err(Error::Peer {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Route a client response to the request waiting for it.
    ///
    /// Returns `false` when nothing was waiting for this id.
    pub fn handle_response(&self, response: JsonRpcResponse) -> bool {
        let waiter = match self.pending() {
            Ok(mut pending) => pending.remove(&response.id),
            Err(_) => None,
        };
        match waiter {
            Some(tx) => tx.send(response).is_ok(),
            None => {
                debug!("No pending request for response id {}", response.id);
                false
            }
        }
    }

    /// Fail every request still waiting for the client, and any made later.
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
        if let Ok(mut pending) = self.pending() {
            pending.clear();
        }
    }

    /// Ask the client to sample its language model.
    pub async fn create_message(&self, params: CreateMessageParams) -> Result<CreateMessageResult> {
        if self.state.capabilities.read().await.sampling.is_none() {
            return Err(Error::Unsupported("sampling".to_string()));
        }
        let result = self
            .request("sampling/createMessage", serde_json::to_value(params)?)
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Ask the client to collect input from the user.
    pub async fn elicit(&self, params: ElicitParams) -> Result<ElicitResult> {
        if self.state.capabilities.read().await.elicitation.is_none() {
            return Err(Error::Unsupported("elicitation".to_string()));
        }
        let result = self
            .request("elicitation/create", serde_json::to_value(params)?)
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    fn pending(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<RequestId, oneshot::Sender<JsonRpcResponse>>>>
    {
        self.state
            .pending
            .lock()
            .map_err(|_| Error::Internal("pending request map poisoned".to_string()))
    }
}

/// Removes a pending entry when the waiting request is dropped early.
struct PendingGuard<'a> {
    state: &'a PeerState,
    id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.state.pending.lock() {
            pending.remove(&self.id);
        }
    }
}
