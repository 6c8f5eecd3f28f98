//! Error types for the MCP starter server.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::mcp::protocol::error_codes;
use crate::mcp::registry::CapabilityKind;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A single argument that failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Main error type for the server.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Capability Errors =====
    #[error("Invalid arguments: {}", format_fields(.fields))]
    Validation { fields: Vec<FieldError> },

    #[error("{kind} not found: {name}")]
    NotFound { kind: CapabilityKind, name: String },

    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: CapabilityKind, name: String },

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Invalid URI template: {0}")]
    InvalidUriTemplate(String),

    #[error("Invalid input schema for tool {name}: {reason}")]
    InvalidSchema { name: String, reason: String },

    // ===== MCP Errors =====
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Client does not support {0}")]
    Unsupported(String),

    #[error("Client returned error {code}: {message}")]
    Peer { code: i32, message: String },

    #[error("Connection closed")]
    ConnectionClosed,

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== Internal Errors =====
    #[error("HTTP server error: {0}")]
    HttpServer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Cancelled: operation was cancelled")]
    Cancelled,
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a validation error for a single field.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            fields: vec![FieldError::new(field, reason)],
        }
    }

    /// Create a not-found error for the given capability kind.
    pub fn not_found(kind: CapabilityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Wrap any failure raised inside a handler, keeping handler errors as they are.
    pub fn into_handler_error(self) -> Self {
        match self {
            Self::Handler(_) => self,
            other => Self::Handler(other.to_string()),
        }
    }

    /// The message shown to the caller for a handler failure.
    pub fn handler_message(&self) -> String {
        match self {
            Self::Handler(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// JSON-RPC error code used when this error reaches the transport.
    pub fn code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
            Self::NotFound { kind, .. } => match kind {
                CapabilityKind::Resource | CapabilityKind::ResourceTemplate => {
                    error_codes::RESOURCE_NOT_FOUND
                }
                CapabilityKind::Tool | CapabilityKind::Prompt => error_codes::INVALID_PARAMS,
            },
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Structured error data attached to the JSON-RPC error, if any.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::Validation { fields } => Some(json!({ "fields": fields })),
            Self::NotFound { kind, name } => Some(json!({ "kind": kind, "name": name })),
            Self::Handler(_) => Some(json!({ "kind": "handler" })),
            _ => None,
        }
    }
}
