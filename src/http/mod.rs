//! HTTP server for MCP over HTTP/SSE transport.
//!
//! Provides an alternative to stdio transport for web-based clients. Each
//! `POST /mcp` carries one JSON-RPC message and is served as its own session.
//! Clients that accept `text/event-stream` receive the request's progress and
//! log notifications as SSE events ahead of the final response.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mcp::peer::Peer;
use crate::mcp::protocol::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::mcp::server::{McpServer, Session};
use crate::mcp::transport::Message;

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    server: McpServer,
}

/// Build the router serving the MCP endpoint.
pub fn router(server: McpServer) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/mcp", post(mcp_endpoint))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(HttpState { server })
}

/// Start the HTTP server and serve until Ctrl-C.
pub async fn start_server(config: &Config, server: McpServer) -> Result<()> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::HttpServer(format!("failed to bind {}: {}", addr, e)))?;
    info!("Starting HTTP server on {}", addr);

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Health check endpoint.
async fn health_check(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "name": state.server.name(),
        "version": crate::VERSION
    }))
}

/// Prometheus metrics endpoint.
async fn metrics(State(state): State<HttpState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.server.metrics().to_prometheus(),
    )
}

/// The MCP endpoint.
async fn mcp_endpoint(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => return bad_request(error_codes::PARSE_ERROR, &Error::from(e)),
    };
    let message = match Message::from_value(value) {
        Ok(message) => message,
        Err(e) => return bad_request(error_codes::INVALID_REQUEST, &e),
    };

    match message {
        Message::Request(req) if accepts_event_stream(&headers) => {
            stream_request(state, req).await
        }
        Message::Request(req) => {
            let session = detached_session();
            match state.server.handle_request(&session, req).await {
                Some(response) => Json(response).into_response(),
                None => StatusCode::ACCEPTED.into_response(),
            }
        }
        Message::Notification(notif) => {
            let session = detached_session();
            state.server.handle_notification(&session, notif).await;
            StatusCode::ACCEPTED.into_response()
        }
        Message::Response(resp) => {
            debug!("Ignoring client response {} over HTTP", resp.id);
            StatusCode::ACCEPTED.into_response()
        }
    }
}

/// Serve a request as an SSE stream: notifications first, response last.
async fn stream_request(state: HttpState, req: JsonRpcRequest) -> Response {
    let (tx, rx) = mpsc::channel::<Message>(32);
    let session = Session::new(Peer::notifications_only(tx.clone()));
    let id = req.id.clone();
    let cancel = match session.track(&id).await {
        Ok(cancel) => cancel,
        Err(e) => return Json(JsonRpcResponse::failure(id, JsonRpcError::from(&e))).into_response(),
    };

    // Abandon the request if the client goes away.
    let watcher = {
        let tx = tx.clone();
        let id = id.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tx.closed().await;
            debug!("SSE client for request {} disconnected", id);
            cancel.cancel();
        })
    };

    tokio::spawn(async move {
        if let Some(response) = state.server.handle_tracked(&session, req, cancel).await {
            if tx.send(Message::Response(response)).await.is_err() {
                debug!("SSE client gone before response to {}", id);
            }
        }
        watcher.abort();
    });

    let stream = ReceiverStream::new(rx).map(|message| Event::default().json_data(message));
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// A session whose notifications are discarded.
fn detached_session() -> Session {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    Session::new(Peer::notifications_only(tx))
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("text/event-stream"))
}

fn bad_request(code: i32, err: &Error) -> Response {
    debug!("Rejecting malformed MCP body: {}", err);
    (
        StatusCode::BAD_REQUEST,
        Json(JsonRpcResponse::malformed(code, err.to_string())),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::context::InvocationContext;
    use crate::mcp::handler::{Arguments, ToolHandler, ToolOutput};
    use crate::mcp::protocol::Tool;
    use crate::mcp::registry::CapabilityRegistry;
    use crate::metrics::Metrics;
    use async_trait::async_trait;
    use axum::http::HeaderValue;

    struct CountTool;

    #[async_trait]
    impl ToolHandler for CountTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "count".to_string(),
                title: None,
                description: "Counts to two".to_string(),
                input_schema: crate::tool_schema!(),
                output_schema: None,
                annotations: None,
            }
        }

        async fn execute(
            &self,
            _args: Arguments,
            ctx: &InvocationContext,
        ) -> crate::error::Result<ToolOutput> {
            ctx.report_progress(1.0, Some(2.0), None).await;
            ctx.report_progress(2.0, Some(2.0), None).await;
            Ok(ToolOutput::from("counted"))
        }
    }

    fn state() -> HttpState {
        let mut registry = CapabilityRegistry::new();
        registry.register_tool(CountTool).unwrap();
        HttpState {
            server: McpServer::new(registry, Metrics::new(), "http-test"),
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn call_body() -> Bytes {
        Bytes::from(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": {"name": "count", "_meta": {"progressToken": 5}}
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn test_json_request() {
        let response = mcp_endpoint(State(state()), HeaderMap::new(), call_body()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["result"]["content"][0]["text"], "counted");
    }

    #[tokio::test]
    async fn test_sse_request_streams_progress_then_response() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );

        let response = mcp_endpoint(State(state()), headers, call_body()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let text = body_text(response).await;
        let events: Vec<Value> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim_start()).unwrap())
            .collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["method"], "notifications/progress");
        assert_eq!(events[0]["params"]["progress"], 1.0);
        assert_eq!(events[1]["params"]["progress"], 2.0);
        assert_eq!(events[2]["id"], 1);
        assert_eq!(events[2]["result"]["content"][0]["text"], "counted");
    }

    #[tokio::test]
    async fn test_notification_is_accepted() {
        let body = Bytes::from(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
        let response = mcp_endpoint(State(state()), HeaderMap::new(), body).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let response =
            mcp_endpoint(State(state()), HeaderMap::new(), Bytes::from("{not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["error"]["code"], error_codes::PARSE_ERROR);

        let response =
            mcp_endpoint(State(state()), HeaderMap::new(), Bytes::from(r#"{"jsonrpc":"2.0"}"#))
                .await;
        let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["error"]["code"], error_codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_sampling_is_unsupported_over_http() {
        let session = detached_session();
        let err = session
            .peer()
            .request("sampling/createMessage", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let state = state();
        let response = health_check(State(state.clone())).await.into_response();
        let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["name"], "http-test");

        let response = metrics(State(state)).await.into_response();
        assert!(body_text(response).await.contains("mcp_starter_requests_total"));
    }
}
