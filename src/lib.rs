//! MCP Rust Starter
//!
//! A feature-complete starter Model Context Protocol (MCP) server: example
//! tools, static and templated resources, and prompts, wired into a server
//! that owns capability registration and dispatch.
//!
//! # Architecture
//!
//! 1. **MCP Layer** (`mcp`) - Registry, resource resolution, dispatch,
//!    progress reporting, JSON-RPC protocol and stdio transport
//! 2. **Capabilities** (`tools`, `resources`, `prompts`) - The example
//!    handlers registered at startup
//! 3. **HTTP** (`http`) - `POST /mcp` with JSON or SSE responses
//!
//! # Features
//!
//! - **Tool annotations** and structured output
//! - **Progress** notifications from long-running tools
//! - **Sampling and elicitation** requests back to the client
//! - **Dynamic tools** announced with `notifications/tools/list_changed`
//! - **Completions** for prompt arguments and template parameters

pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod metrics;
pub mod prompts;
pub mod resources;
pub mod tools;

use chrono::Utc;
use std::sync::Arc;

pub use error::{Error, Result};

use crate::config::Config;
use crate::mcp::registry::CapabilityRegistry;
use crate::metrics::Metrics;

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name reported in `initialize`.
pub const SERVER_NAME: &str = "mcp-rust-starter";

/// Instructions returned to clients from `initialize`.
pub const SERVER_INSTRUCTIONS: &str = r#"# MCP Rust Starter Server

A demonstration MCP server showcasing Rust capabilities.

## Available Tools

### Greeting & Demos
- **hello**: Simple greeting - use to test connectivity
- **get_weather**: Returns simulated weather data
- **long_task**: Demonstrates progress reporting (takes ~5 seconds)

### LLM Interaction
- **ask_llm**: Invoke LLM sampling to ask questions (requires client support)

### User Input
- **confirm_action**: Asks the user to confirm an action (requires elicitation support)
- **get_feedback**: Opens the feedback form in the browser (requires URL elicitation support)

### Dynamic Features
- **load_bonus_tool**: Dynamically adds a calculator tool at runtime
- **bonus_calculator**: Available after calling load_bonus_tool

## Available Resources

- **about://server**: Information about this server
- **doc://example**: An example markdown document
- **config://settings**: Server configuration as JSON
- **status://server**: Current server status
- **greeting://{name}**: A personalized greeting
- **item://{id}**: Data for an item by ID (1, 2 or 3)

## Available Prompts

- **greet**: Generates a greeting in a chosen style
- **code_review**: Structured code review prompt

## Recommended Workflows

1. **Testing Connection**: Call `hello` with your name to verify the server is responding
2. **Weather Demo**: Call `get_weather` with a location to see structured output
3. **Progress Demo**: Call `long_task` to see progress notifications
4. **Dynamic Loading**: Call `load_bonus_tool`, then refresh tools to see `bonus_calculator`

## Tool Annotations

All tools include annotations indicating:
- Whether they modify state (readOnlyHint)
- If they're safe to retry (idempotentHint)
- Whether they access external systems (openWorldHint)

Use these hints to make informed decisions about tool usage."#;

/// Build the registry holding every tool, resource and prompt.
pub fn build_registry(config: &Arc<Config>, metrics: &Arc<Metrics>) -> Result<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();
    tools::register_all_tools(&mut registry, config.clone())?;
    resources::register_all_resources(&mut registry, config.clone(), metrics.clone(), Utc::now())?;
    prompts::register_all_prompts(&mut registry)?;
    Ok(registry)
}
