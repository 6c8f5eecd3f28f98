//! MCP resource implementations.
//!
//! Static resources (`about://server`, `doc://example`, `config://settings`,
//! `status://server`) and the `greeting://{name}` and `item://{id}`
//! templates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mcp::context::InvocationContext;
use crate::mcp::handler::ResourceHandler;
use crate::mcp::registry::{CapabilityKind, CapabilityRegistry};
use crate::mcp::resources::{Resource, ResourceOutput, ResourceTemplate};
use crate::mcp::template::UriParams;
use crate::metrics::Metrics;

/// Register all resources and resource templates.
pub fn register_all_resources(
    registry: &mut CapabilityRegistry,
    config: Arc<Config>,
    metrics: Arc<Metrics>,
    started_at: DateTime<Utc>,
) -> Result<()> {
    registry.register_resource(
        Resource::new("about://server", "About")
            .with_description("Information about this MCP server")
            .with_mime_type("text/plain"),
        AboutResource,
    )?;
    registry.register_resource(
        Resource::new("doc://example", "Example Document")
            .with_description("An example document resource")
            .with_mime_type("text/markdown"),
        FileResource::new(config.example_doc.clone()),
    )?;
    registry.register_resource(
        Resource::new("config://settings", "Server Settings")
            .with_description("Server configuration as JSON")
            .with_mime_type("application/json"),
        ConfigResource::new(config),
    )?;
    registry.register_resource(
        Resource::new("status://server", "Server Status")
            .with_description("Current server status")
            .with_mime_type("application/json"),
        StatusResource::new(metrics, started_at),
    )?;

    registry.register_template(
        ResourceTemplate::new("greeting://{name}", "Personalized Greeting")
            .with_description("A personalized greeting for a specific person")
            .with_mime_type("text/plain"),
        GreetingTemplate,
    )?;
    registry.register_template(
        ResourceTemplate::new("item://{id}", "Item Data")
            .with_description("Data for a specific item by ID")
            .with_mime_type("application/json"),
        ItemTemplate,
    )?;

    Ok(())
}

/// Information about this server.
pub struct AboutResource;

#[async_trait]
impl ResourceHandler for AboutResource {
    async fn read(
        &self,
        _uri: &str,
        _params: &UriParams,
        _ctx: &InvocationContext,
    ) -> Result<ResourceOutput> {
        Ok(ResourceOutput::Text(format!(
            "MCP Rust Starter v{}

This is a feature-complete MCP server demonstrating:
- Tools with annotations and structured output
- Resources (static and dynamic)
- Resource templates
- Prompts with completions
- Sampling, elicitation, progress updates, and dynamic tool loading

For more information, visit: https://modelcontextprotocol.io",
            crate::VERSION
        )))
    }
}

/// Serves a file from disk as text.
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ResourceHandler for FileResource {
    async fn read(
        &self,
        uri: &str,
        _params: &UriParams,
        _ctx: &InvocationContext,
    ) -> Result<ResourceOutput> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(ResourceOutput::Text(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} is backed by missing file {}", uri, self.path.display());
                Err(Error::not_found(CapabilityKind::Resource, uri))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// The running configuration.
pub struct ConfigResource {
    config: Arc<Config>,
}

impl ConfigResource {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ResourceHandler for ConfigResource {
    async fn read(
        &self,
        _uri: &str,
        _params: &UriParams,
        _ctx: &InvocationContext,
    ) -> Result<ResourceOutput> {
        Ok(ResourceOutput::Json(json!({
            "name": crate::SERVER_NAME,
            "version": crate::VERSION,
            "settings": serde_json::to_value(self.config.as_ref())?,
        })))
    }
}

/// Uptime and request counters.
pub struct StatusResource {
    metrics: Arc<Metrics>,
    started_at: DateTime<Utc>,
}

impl StatusResource {
    pub fn new(metrics: Arc<Metrics>, started_at: DateTime<Utc>) -> Self {
        Self {
            metrics,
            started_at,
        }
    }
}

#[async_trait]
impl ResourceHandler for StatusResource {
    async fn read(
        &self,
        _uri: &str,
        _params: &UriParams,
        _ctx: &InvocationContext,
    ) -> Result<ResourceOutput> {
        let uptime = Utc::now().signed_duration_since(self.started_at);
        Ok(ResourceOutput::Json(json!({
            "status": "running",
            "version": crate::VERSION,
            "startedAt": self.started_at.to_rfc3339(),
            "uptimeSeconds": uptime.num_seconds().max(0),
            "requests": self.metrics.snapshot(),
        })))
    }
}

/// `greeting://{name}`
pub struct GreetingTemplate;

#[async_trait]
impl ResourceHandler for GreetingTemplate {
    async fn read(
        &self,
        _uri: &str,
        params: &UriParams,
        _ctx: &InvocationContext,
    ) -> Result<ResourceOutput> {
        let name = params
            .get("name")
            .ok_or_else(|| Error::invalid_field("name", "missing template parameter"))?;
        Ok(ResourceOutput::Text(format!(
            "Hello, {}! This greeting was generated just for you.",
            name
        )))
    }
}

/// Example items served by `item://{id}`: (id, name, description).
static ITEMS: [(&str, &str, &str); 3] = [
    ("1", "Widget", "A useful widget"),
    ("2", "Gadget", "A fancy gadget"),
    ("3", "Gizmo", "A mysterious gizmo"),
];

/// `item://{id}`
pub struct ItemTemplate;

#[async_trait]
impl ResourceHandler for ItemTemplate {
    async fn read(
        &self,
        _uri: &str,
        params: &UriParams,
        _ctx: &InvocationContext,
    ) -> Result<ResourceOutput> {
        let id = params
            .get("id")
            .ok_or_else(|| Error::invalid_field("id", "missing template parameter"))?;

        let (id, name, description) = ITEMS
            .iter()
            .find(|(item_id, _, _)| *item_id == id.as_str())
            .ok_or_else(|| Error::Handler(format!("Item not found: {}", id)))?;

        Ok(ResourceOutput::Json(json!({
            "id": id,
            "name": name,
            "description": description,
        })))
    }

    fn complete(&self, param: &str, prefix: &str) -> Vec<String> {
        if param != "id" {
            return Vec::new();
        }
        ITEMS
            .iter()
            .map(|(id, _, _)| *id)
            .filter(|id| id.starts_with(prefix))
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::context::test_context;
    use crate::mcp::dispatch::Dispatcher;
    use serde_json::Value;
    use std::io::Write;

    fn registry_with(config: Config) -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        register_all_resources(
            &mut registry,
            Arc::new(config),
            Metrics::new(),
            Utc::now(),
        )
        .unwrap();
        registry
    }

    fn dispatcher(config: Config) -> Dispatcher {
        Dispatcher::new(Arc::new(registry_with(config)), Metrics::new())
    }

    #[test]
    fn test_registration_counts() {
        let registry = registry_with(Config::default());
        assert_eq!(registry.count(CapabilityKind::Resource), 4);
        assert_eq!(registry.count(CapabilityKind::ResourceTemplate), 2);
    }

    #[tokio::test]
    async fn test_greeting_template() {
        let (ctx, _rx) = test_context(None);
        let result = dispatcher(Config::default())
            .read_resource("greeting://Ada%20Lovelace", &ctx)
            .await
            .into_result()
            .unwrap();

        let contents = &result.contents[0];
        assert_eq!(contents.uri, "greeting://Ada%20Lovelace");
        assert_eq!(contents.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(
            contents.text,
            "Hello, Ada Lovelace! This greeting was generated just for you."
        );
    }

    #[tokio::test]
    async fn test_empty_greeting_name_is_not_found() {
        let (ctx, _rx) = test_context(None);
        let err = dispatcher(Config::default())
            .read_resource("greeting://", &ctx)
            .await
            .into_result()
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_item_lookup() {
        let (ctx, _rx) = test_context(None);
        let dispatcher = dispatcher(Config::default());

        let result = dispatcher
            .read_resource("item://2", &ctx)
            .await
            .into_result()
            .unwrap();
        assert_eq!(
            result.contents[0].mime_type.as_deref(),
            Some("application/json")
        );
        let item: Value = serde_json::from_str(&result.contents[0].text).unwrap();
        assert_eq!(item, json!({"id": "2", "name": "Gadget", "description": "A fancy gadget"}));

        let err = dispatcher
            .read_resource("item://42", &ctx)
            .await
            .into_result()
            .unwrap_err();
        assert!(matches!(err, Error::Handler(ref m) if m == "Item not found: 42"));
    }

    #[test]
    fn test_item_completion() {
        assert_eq!(ItemTemplate.complete("id", ""), vec!["1", "2", "3"]);
        assert_eq!(ItemTemplate.complete("id", "2"), vec!["2"]);
        assert!(ItemTemplate.complete("id", "9").is_empty());
        assert!(ItemTemplate.complete("name", "").is_empty());
    }

    #[tokio::test]
    async fn test_example_doc_reads_configured_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# Workshop notes").unwrap();

        let config = Config {
            example_doc: file.path().to_path_buf(),
            ..Config::default()
        };
        let (ctx, _rx) = test_context(None);
        let result = dispatcher(config)
            .read_resource("doc://example", &ctx)
            .await
            .into_result()
            .unwrap();

        assert_eq!(result.contents[0].text, "# Workshop notes\n");
        assert_eq!(result.contents[0].mime_type.as_deref(), Some("text/markdown"));
    }

    #[tokio::test]
    async fn test_missing_example_doc_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            example_doc: dir.path().join("missing.md"),
            ..Config::default()
        };
        let (ctx, _rx) = test_context(None);
        let err = dispatcher(config)
            .read_resource("doc://example", &ctx)
            .await
            .into_result()
            .unwrap_err();

        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(err.code(), crate::mcp::protocol::error_codes::RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_config_and_status_are_json() {
        let config = Config {
            greeting: "Howdy".to_string(),
            ..Config::default()
        };
        let (ctx, _rx) = test_context(None);
        let dispatcher = dispatcher(config);

        let result = dispatcher
            .read_resource("config://settings", &ctx)
            .await
            .into_result()
            .unwrap();
        let settings: Value = serde_json::from_str(&result.contents[0].text).unwrap();
        assert!(settings["settings"].get("greeting").is_none());
        assert!(!result.contents[0].text.contains("Howdy"));
        assert_eq!(settings["settings"]["transport"], "stdio");

        let result = dispatcher
            .read_resource("status://server", &ctx)
            .await
            .into_result()
            .unwrap();
        let status: Value = serde_json::from_str(&result.contents[0].text).unwrap();
        assert_eq!(status["status"], "running");
        assert!(status["uptimeSeconds"].as_i64().unwrap() >= 0);
        assert!(status["requests"]["requests_total"].is_u64());
    }

    #[tokio::test]
    async fn test_about_mentions_version() {
        let (ctx, _rx) = test_context(None);
        let output = AboutResource
            .read("about://server", &UriParams::new(), &ctx)
            .await
            .unwrap();
        let ResourceOutput::Text(text) = output else {
            panic!("Expected text");
        };
        assert!(text.starts_with(&format!("MCP Rust Starter v{}", crate::VERSION)));
    }
}
