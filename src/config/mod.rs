//! Configuration management for the MCP starter server.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command-line arguments for the MCP starter server.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-starter")]
#[command(author = "MCP Starters")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Starter MCP server with example tools, resources and prompts")]
pub struct Args {
    /// Serve over stdin/stdout (default)
    #[arg(long, conflicts_with = "http")]
    pub stdio: bool,

    /// Serve over HTTP
    #[arg(long)]
    pub http: bool,

    /// HTTP port (only for http transport)
    #[arg(short, long, default_value = "3000", env = "MCP_PORT")]
    pub port: u16,

    /// HTTP bind address (only for http transport)
    #[arg(long, default_value = "0.0.0.0", env = "MCP_HOST")]
    pub host: String,

    /// Greeting used by the hello tool
    #[arg(short, long, default_value = "Hello", env = "MCP_GREETING")]
    pub greeting: String,

    /// File served as the doc://example resource
    #[arg(long, default_value = "resources/example.md", env = "MCP_EXAMPLE_DOC")]
    pub example_doc: PathBuf,

    /// Enable debug logging
    #[arg(short, long, env = "MCP_DEBUG")]
    pub debug: bool,
}

impl Args {
    /// The transport selected by the flags.
    pub fn transport(&self) -> Transport {
        if self.http {
            Transport::Http
        } else {
            Transport::Stdio
        }
    }
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Server configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport mode
    pub transport: Transport,
    /// HTTP bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Greeting used by the hello tool. Environment-supplied, so it is
    /// never serialized back out to clients.
    #[serde(skip_serializing)]
    pub greeting: String,
    /// Path of the example document resource
    pub example_doc: PathBuf,
    /// Debug mode
    pub debug: bool,
}

impl Config {
    /// Address the HTTP transport binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            transport: args.transport(),
            host: args.host,
            port: args.port,
            greeting: args.greeting,
            example_doc: args.example_doc,
            debug: args.debug,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            host: "0.0.0.0".to_string(),
            port: 3000,
            greeting: "Hello".to_string(),
            example_doc: PathBuf::from("resources/example.md"),
            debug: false,
        }
    }
}
