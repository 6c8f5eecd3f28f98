//! Model Context Protocol (MCP) implementation.
//!
//! This module provides the server side of MCP: JSON-RPC message handling,
//! transport layers, capability registration and dispatch.
//!
//! # Architecture
//!
//! - `protocol` - Core MCP types and message definitions
//! - `registry` - Capability registry (tools, resources, templates, prompts)
//! - `template` / `resources` - URI templates and resource resolution
//! - `schema` - Argument validation against declared input schemas
//! - `dispatch` - Invocation lifecycle and output adaptation
//! - `context` / `progress` / `peer` - Per-invocation context and notifications
//! - `server` - MCP server implementation
//! - `transport` - Transport layer (stdio)

pub mod context;
pub mod dispatch;
pub mod handler;
pub mod peer;
pub mod progress;
pub mod prompts;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod schema;
pub mod server;
pub mod template;
pub mod transport;

pub use context::InvocationContext;
pub use dispatch::{Dispatcher, InvocationState, Outcome};
pub use handler::{PromptHandler, ResourceHandler, ToolHandler, ToolOutput};
pub use peer::Peer;
pub use protocol::*;
pub use registry::{CapabilityKind, CapabilityRegistry};
pub use server::{McpServer, Session};
pub use transport::{Message, StdioTransport, Transport};
