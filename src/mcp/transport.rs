//! MCP transport layer implementations.
//!
//! The stdio transport speaks newline-delimited JSON-RPC. The HTTP transport
//! lives in `crate::http` and feeds the same `Message` type.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::mcp::protocol::{
    error_codes, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
};

/// A message that can be sent or received.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Message {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl Message {
    /// Classify a decoded JSON value: `method` and `id` make a request,
    /// `method` alone a notification, `id` alone a response.
    pub fn from_value(value: Value) -> Result<Self> {
        let has_method = value.get("method").is_some();
        let has_id = value.get("id").is_some_and(|id| !id.is_null());

        match (has_method, has_id) {
            (true, true) => Ok(Self::Request(serde_json::from_value(value)?)),
            (true, false) => Ok(Self::Notification(serde_json::from_value(value)?)),
            (false, true) => Ok(Self::Response(serde_json::from_value(value)?)),
            (false, false) => Err(Error::McpProtocol(
                "message has neither method nor id".to_string(),
            )),
        }
    }

    /// Parse one JSON-RPC message from text.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Parse one line of input, or build the error response owed to the
    /// client when the line is not valid JSON-RPC.
    pub fn parse_line(text: &str) -> std::result::Result<Self, JsonRpcResponse> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            JsonRpcResponse::malformed(error_codes::PARSE_ERROR, format!("Parse error: {}", e))
        })?;
        Self::from_value(value).map_err(|e| {
            JsonRpcResponse::malformed(
                error_codes::INVALID_REQUEST,
                format!("Invalid request: {}", e),
            )
        })
    }
}

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send {
    /// Start the transport, returning channels for messages.
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)>;

    /// Stop the transport, flushing anything still queued for the client.
    async fn stop(&mut self) -> Result<()>;
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Stdio transport for MCP.
pub struct StdioTransport {
    reader: Option<BoxedReader>,
    writer: Option<BoxedWriter>,
    writer_task: Option<JoinHandle<()>>,
}

impl StdioTransport {
    /// Create a transport over the process stdin and stdout.
    pub fn new() -> Self {
        Self::with_io(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Create a transport over arbitrary byte streams.
    pub fn with_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Some(Box::new(reader)),
            writer: Some(Box::new(writer)),
            writer_task: None,
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| Error::Internal("transport already started".to_string()))?;
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| Error::Internal("transport already started".to_string()))?;

        // Channel for incoming messages (from stdin)
        let (incoming_tx, incoming_rx) = mpsc::channel::<Message>(100);
        // Channel for outgoing messages (to stdout)
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(100);

        let replies = outgoing_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();

            loop {
                match lines.next_line().await {
                    Ok(None) => {
                        debug!("EOF on stdin, stopping transport");
                        break;
                    }
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }

                        trace!("Received: {}", trimmed);

                        match Message::parse_line(trimmed) {
                            Ok(msg) => {
                                if incoming_tx.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            Err(response) => {
                                warn!("Rejecting message: {}", trimmed);
                                if replies.send(Message::Response(response)).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let writer_task = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Error serializing message: {}", e);
                        continue;
                    }
                };

                trace!("Sending: {}", json);
                let written = async {
                    writer.write_all(json.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await
                };
                if let Err(e) = written.await {
                    error!("Error writing to stdout: {}", e);
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });
        self.writer_task = Some(writer_task);

        Ok((incoming_rx, outgoing_tx))
    }

    async fn stop(&mut self) -> Result<()> {
        // The writer exits once every outgoing sender has been dropped.
        if let Some(task) = self.writer_task.take() {
            task.await
                .map_err(|e| Error::Internal(format!("writer task failed: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::RequestId;
    use serde_json::json;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_message_classification() {
        let request = Message::from_value(json!({
            "jsonrpc": "2.0", "id": 1, "method": "ping"
        }))
        .unwrap();
        assert!(matches!(request, Message::Request(ref r) if r.id == RequestId::Number(1)));

        let notification = Message::from_value(json!({
            "jsonrpc": "2.0", "method": "notifications/initialized"
        }))
        .unwrap();
        assert!(matches!(notification, Message::Notification(_)));

        let response = Message::from_value(json!({
            "jsonrpc": "2.0", "id": "srv-1", "result": {}
        }))
        .unwrap();
        assert!(matches!(response, Message::Response(_)));

        assert!(Message::from_value(json!({"jsonrpc": "2.0"})).is_err());
        assert!(Message::from_json("not json").is_err());
    }

    #[test]
    fn test_message_serializes_without_wrapper() {
        let msg = Message::Notification(JsonRpcNotification::new("notifications/progress", None));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["method"], "notifications/progress");
        assert!(json.get("Notification").is_none());
    }

    #[tokio::test]
    async fn test_stdio_transport_round_trip() {
        let (mut client_write, server_read) = tokio::io::duplex(4096);
        let (server_write, mut client_read) = tokio::io::duplex(4096);

        let mut transport = StdioTransport::with_io(server_read, server_write);
        let (mut incoming, outgoing) = transport.start().await.unwrap();

        client_write
            .write_all(b"\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\ngarbage\n")
            .await
            .unwrap();
        drop(client_write);

        match incoming.recv().await.unwrap() {
            Message::Request(req) => assert_eq!(req.method, "ping"),
            other => panic!("Expected request, got {:?}", other),
        }
        assert!(incoming.recv().await.is_none());

        outgoing
            .send(Message::Response(JsonRpcResponse::success(
                RequestId::Number(7),
                json!({}),
            )))
            .await
            .unwrap();
        drop(outgoing);
        transport.stop().await.unwrap();

        let mut written = String::new();
        client_read.read_to_string(&mut written).await.unwrap();
        let values: Vec<Value> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(values.len(), 2);

        let parse_error = values.iter().find(|v| v["id"].is_null()).unwrap();
        assert_eq!(parse_error["error"]["code"], error_codes::PARSE_ERROR);

        let response = values.iter().find(|v| v["id"] == 7).unwrap();
        assert_eq!(response["result"], json!({}));
    }

    #[test]
    fn test_parse_line_errors() {
        let err = Message::parse_line("{not json").unwrap_err();
        assert_eq!(err.id, RequestId::Null);
        assert_eq!(err.error.unwrap().code, error_codes::PARSE_ERROR);

        let err = Message::parse_line(r#"{"jsonrpc":"2.0","id":3,"method":5}"#).unwrap_err();
        assert_eq!(err.id, RequestId::Null);
        assert_eq!(err.error.unwrap().code, error_codes::INVALID_REQUEST);

        let err = Message::parse_line(r#"{"jsonrpc":"2.0"}"#).unwrap_err();
        assert_eq!(err.error.unwrap().code, error_codes::INVALID_REQUEST);

        assert!(matches!(
            Message::parse_line(r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#),
            Ok(Message::Request(_))
        ));
    }
}
