//! Capability registry.
//!
//! Holds every tool, resource, resource template and prompt the server
//! offers. Entries are added during startup and never removed; once the
//! registry is shared behind an `Arc` it is read without locking.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::handler::{PromptHandler, ResourceHandler, ToolHandler};
use crate::mcp::prompts::Prompt;
use crate::mcp::protocol::Tool;
use crate::mcp::resources::{Resource, ResourceTemplate};
use crate::mcp::schema::ArgumentValidator;
use crate::mcp::template::UriTemplate;

/// The kind of a registered capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Tool,
    Resource,
    ResourceTemplate,
    Prompt,
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Tool => "tool",
            Self::Resource => "resource",
            Self::ResourceTemplate => "resource template",
            Self::Prompt => "prompt",
        };
        f.write_str(name)
    }
}

/// A registered tool.
#[derive(Clone)]
pub struct ToolEntry {
    pub definition: Tool,
    pub validator: Arc<ArgumentValidator>,
    pub handler: Arc<dyn ToolHandler>,
}

/// A registered static resource.
#[derive(Clone)]
pub struct ResourceEntry {
    pub definition: Resource,
    pub handler: Arc<dyn ResourceHandler>,
}

/// A registered resource template.
#[derive(Clone)]
pub struct TemplateEntry {
    pub definition: ResourceTemplate,
    pub template: UriTemplate,
    pub handler: Arc<dyn ResourceHandler>,
}

/// A registered prompt.
#[derive(Clone)]
pub struct PromptEntry {
    pub definition: Prompt,
    pub handler: Arc<dyn PromptHandler>,
}

/// Entries of one kind, unique by key and kept in registration order.
struct Catalog<E> {
    kind: CapabilityKind,
    entries: Vec<E>,
    index: HashMap<String, usize>,
}

impl<E> Catalog<E> {
    fn new(kind: CapabilityKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn insert(&mut self, key: String, entry: E) -> Result<()> {
        if self.index.contains_key(&key) {
            return Err(Error::DuplicateName {
                kind: self.kind,
                name: key,
            });
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<&E> {
        self.index
            .get(key)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::not_found(self.kind, key))
    }

    fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.iter()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Registry of capability handlers.
pub struct CapabilityRegistry {
    tools: Catalog<ToolEntry>,
    resources: Catalog<ResourceEntry>,
    templates: Catalog<TemplateEntry>,
    prompts: Catalog<PromptEntry>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: Catalog::new(CapabilityKind::Tool),
            resources: Catalog::new(CapabilityKind::Resource),
            templates: Catalog::new(CapabilityKind::ResourceTemplate),
            prompts: Catalog::new(CapabilityKind::Prompt),
        }
    }

    /// Register a tool handler under the name from its definition.
    pub fn register_tool<T: ToolHandler + 'static>(&mut self, handler: T) -> Result<()> {
        self.register_tool_arc(Arc::new(handler))
    }

    /// Register a tool handler (Arc version).
    ///
    /// The input schema is compiled here, so a malformed schema fails
    /// registration rather than the first call.
    pub fn register_tool_arc(&mut self, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let definition = handler.definition();
        let key = definition.name.clone();
        let validator = Arc::new(ArgumentValidator::compile(&key, &definition.input_schema)?);
        self.tools.insert(
            key,
            ToolEntry {
                definition,
                validator,
                handler,
            },
        )
    }

    /// Register a static resource at `definition.uri`.
    pub fn register_resource<H: ResourceHandler + 'static>(
        &mut self,
        definition: Resource,
        handler: H,
    ) -> Result<()> {
        let key = definition.uri.clone();
        self.resources.insert(
            key,
            ResourceEntry {
                definition,
                handler: Arc::new(handler),
            },
        )
    }

    /// Register a resource template at `definition.uri_template`.
    pub fn register_template<H: ResourceHandler + 'static>(
        &mut self,
        definition: ResourceTemplate,
        handler: H,
    ) -> Result<()> {
        let template = UriTemplate::parse(&definition.uri_template)?;
        let key = definition.uri_template.clone();
        self.templates.insert(
            key,
            TemplateEntry {
                definition,
                template,
                handler: Arc::new(handler),
            },
        )
    }

    /// Register a prompt handler under the name from its definition.
    pub fn register_prompt<P: PromptHandler + 'static>(&mut self, handler: P) -> Result<()> {
        let definition = handler.definition();
        let key = definition.name.clone();
        self.prompts.insert(
            key,
            PromptEntry {
                definition,
                handler: Arc::new(handler),
            },
        )
    }

    /// Look up a tool by name.
    pub fn tool(&self, name: &str) -> Result<&ToolEntry> {
        self.tools.get(name)
    }

    /// Look up a static resource by exact URI.
    pub fn resource(&self, uri: &str) -> Result<&ResourceEntry> {
        self.resources.get(uri)
    }

    /// Look up a resource template by its pattern.
    pub fn template(&self, pattern: &str) -> Result<&TemplateEntry> {
        self.templates.get(pattern)
    }

    /// Look up a prompt by name.
    pub fn prompt(&self, name: &str) -> Result<&PromptEntry> {
        self.prompts.get(name)
    }

    /// All tools in registration order, including unavailable ones.
    pub fn tools(&self) -> impl Iterator<Item = &ToolEntry> {
        self.tools.iter()
    }

    /// All static resources in registration order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.resources.iter()
    }

    /// All resource templates in registration order.
    pub fn templates(&self) -> impl Iterator<Item = &TemplateEntry> {
        self.templates.iter()
    }

    /// All prompts in registration order.
    pub fn prompts(&self) -> impl Iterator<Item = &PromptEntry> {
        self.prompts.iter()
    }

    /// Tool definitions currently offered to clients.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .filter(|entry| entry.handler.is_available())
            .map(|entry| entry.definition.clone())
            .collect()
    }

    /// Number of registered entries of the given kind.
    pub fn count(&self, kind: CapabilityKind) -> usize {
        match kind {
            CapabilityKind::Tool => self.tools.len(),
            CapabilityKind::Resource => self.resources.len(),
            CapabilityKind::ResourceTemplate => self.templates.len(),
            CapabilityKind::Prompt => self.prompts.len(),
        }
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
