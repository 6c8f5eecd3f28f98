//! MCP prompt implementations.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mcp::context::InvocationContext;
use crate::mcp::handler::PromptHandler;
use crate::mcp::prompts::{Prompt, PromptArgument};
use crate::mcp::registry::CapabilityRegistry;

/// Register all prompts with the registry.
pub fn register_all_prompts(registry: &mut CapabilityRegistry) -> Result<()> {
    registry.register_prompt(GreetPrompt)?;
    registry.register_prompt(CodeReviewPrompt)?;
    Ok(())
}

/// Values of `candidates` starting with `prefix`, case-insensitively.
fn complete_from(candidates: &[&str], prefix: &str) -> Vec<String> {
    let prefix = prefix.to_lowercase();
    candidates
        .iter()
        .filter(|c| c.starts_with(&prefix))
        .map(|c| c.to_string())
        .collect()
}

fn required_arg<'a>(arguments: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    arguments
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| Error::invalid_field(name, "is required"))
}

const GREETING_STYLES: [&str; 3] = ["formal", "casual", "enthusiastic"];

/// Generates a greeting in a chosen style.
pub struct GreetPrompt;

#[async_trait]
impl PromptHandler for GreetPrompt {
    fn definition(&self) -> Prompt {
        Prompt {
            name: "greet".to_string(),
            title: Some("Greeting Prompt".to_string()),
            description: Some("Generate a greeting in a specific style".to_string()),
            arguments: vec![
                PromptArgument::required("name", "Name of the person to greet"),
                PromptArgument::optional(
                    "style",
                    "The greeting style (formal, casual, or enthusiastic)",
                ),
            ],
        }
    }

    async fn render(
        &self,
        arguments: &HashMap<String, String>,
        _ctx: &InvocationContext,
    ) -> Result<String> {
        let name = required_arg(arguments, "name")?;
        let style = arguments.get("style").map(String::as_str).unwrap_or("casual");

        // Unknown styles fall back to casual.
        Ok(match style {
            "formal" => format!("Please compose a formal, professional greeting for {}.", name),
            "enthusiastic" => format!("Create an excited, enthusiastic greeting for {}!", name),
            _ => format!("Write a casual, friendly hello to {}.", name),
        })
    }

    fn complete(&self, argument: &str, prefix: &str) -> Vec<String> {
        match argument {
            "style" => complete_from(&GREETING_STYLES, prefix),
            _ => Vec::new(),
        }
    }
}

const REVIEW_FOCUS: [&str; 4] = ["security", "performance", "readability", "all"];

const LANGUAGES: [&str; 10] = [
    "c", "cpp", "csharp", "go", "java", "javascript", "python", "ruby", "rust", "typescript",
];

/// Requests a code review with a focus area.
pub struct CodeReviewPrompt;

impl CodeReviewPrompt {
    fn instruction(focus: &str) -> &'static str {
        match focus {
            "security" => "Focus on security vulnerabilities and potential exploits.",
            "performance" => "Focus on performance optimizations and efficiency issues.",
            "readability" => "Focus on code clarity, naming, and maintainability.",
            _ => "Provide a comprehensive review covering security, performance, and readability.",
        }
    }
}

#[async_trait]
impl PromptHandler for CodeReviewPrompt {
    fn definition(&self) -> Prompt {
        Prompt {
            name: "code_review".to_string(),
            title: Some("Code Review".to_string()),
            description: Some("Request a code review with specific focus areas".to_string()),
            arguments: vec![
                PromptArgument::required("code", "The code to review"),
                PromptArgument::required("language", "Programming language"),
                PromptArgument::optional(
                    "focus",
                    "What to focus on (security, performance, readability, or all)",
                ),
            ],
        }
    }

    async fn render(
        &self,
        arguments: &HashMap<String, String>,
        _ctx: &InvocationContext,
    ) -> Result<String> {
        let code = required_arg(arguments, "code")?;
        let language = required_arg(arguments, "language")?;
        let focus = arguments.get("focus").map(String::as_str).unwrap_or("all");

        Ok(format!(
            "Please review the following {language} code. {}\n\n```{language}\n{code}\n```",
            Self::instruction(focus)
        ))
    }

    fn complete(&self, argument: &str, prefix: &str) -> Vec<String> {
        match argument {
            "focus" => complete_from(&REVIEW_FOCUS, prefix),
            "language" => complete_from(&LANGUAGES, prefix),
            _ => Vec::new(),
        }
    }
}
