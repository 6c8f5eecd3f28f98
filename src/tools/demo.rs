//! Demo tools: greeting, simulated weather and a long-running task.

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::mcp::context::InvocationContext;
use crate::mcp::handler::{get_string_arg, Arguments, ToolHandler, ToolOutput};
use crate::mcp::protocol::{LoggingLevel, Tool, ToolAnnotations};

/// Says hello using the configured greeting.
pub struct HelloTool {
    config: Arc<Config>,
}

impl HelloTool {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolHandler for HelloTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "hello".to_string(),
            title: None,
            description: "A friendly greeting tool that says hello to someone.".to_string(),
            input_schema: crate::tool_schema!(
                required: ["name"],
                "name": {
                    "type": "string",
                    "description": "The name to greet"
                }
            ),
            output_schema: None,
            annotations: Some(
                ToolAnnotations::with_title("Say Hello")
                    .read_only(true)
                    .destructive(false)
                    .idempotent(true)
                    .open_world(false),
            ),
        }
    }

    async fn execute(&self, args: Arguments, _ctx: &InvocationContext) -> Result<ToolOutput> {
        let name = get_string_arg(&args, "name")?;
        Ok(format!("{}, {}! Welcome to MCP.", self.config.greeting, name).into())
    }
}

/// Weather conditions the simulation picks from.
const CONDITIONS: [&str; 4] = ["sunny", "cloudy", "rainy", "windy"];

/// Returns simulated weather as structured output.
pub struct GetWeatherTool;

impl GetWeatherTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GetWeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

fn simulate_weather(location: &str) -> Value {
    let mut rng = rand::rng();
    json!({
        "location": location,
        "temperature": rng.random_range(15..=35),
        "unit": "celsius",
        "conditions": CONDITIONS[rng.random_range(0..CONDITIONS.len())],
        "humidity": rng.random_range(40..=80),
    })
}

#[async_trait]
impl ToolHandler for GetWeatherTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_weather".to_string(),
            title: None,
            description: "Get current weather for a location (simulated).".to_string(),
            input_schema: crate::tool_schema!(
                required: ["location"],
                "location": {
                    "type": "string",
                    "description": "City name or coordinates"
                }
            ),
            output_schema: Some(json!({
                "type": "object",
                "properties": {
                    "location": { "type": "string" },
                    "temperature": { "type": "integer" },
                    "unit": { "type": "string", "enum": ["celsius"] },
                    "conditions": { "type": "string", "enum": CONDITIONS },
                    "humidity": { "type": "integer" }
                },
                "required": ["location", "temperature", "unit", "conditions", "humidity"]
            })),
            // Simulated, so results vary and nothing external is called.
            annotations: Some(
                ToolAnnotations::with_title("Get Weather")
                    .read_only(true)
                    .destructive(false)
                    .idempotent(false)
                    .open_world(false),
            ),
        }
    }

    async fn execute(&self, args: Arguments, _ctx: &InvocationContext) -> Result<ToolOutput> {
        let location = get_string_arg(&args, "location")?;
        Ok(simulate_weather(&location).into())
    }
}

/// Number of steps `long_task` runs through.
const LONG_TASK_STEPS: u32 = 5;

/// Runs for a few seconds, reporting progress after each step.
pub struct LongTaskTool {
    step: Duration,
}

impl LongTaskTool {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }
}

#[async_trait]
impl ToolHandler for LongTaskTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "long_task".to_string(),
            title: None,
            description: "A task that takes 5 seconds and reports progress along the way."
                .to_string(),
            input_schema: crate::tool_schema!(
                required: ["task_name"],
                "task_name": {
                    "type": "string",
                    "description": "Name for this task"
                }
            ),
            output_schema: None,
            annotations: Some(
                ToolAnnotations::with_title("Long Running Task")
                    .read_only(true)
                    .destructive(false)
                    .idempotent(true)
                    .open_world(false),
            ),
        }
    }

    async fn execute(&self, args: Arguments, ctx: &InvocationContext) -> Result<ToolOutput> {
        let task_name = get_string_arg(&args, "task_name")?;
        ctx.log(LoggingLevel::Info, format!("Starting task: {}", task_name))
            .await;

        for i in 0..LONG_TASK_STEPS {
            let message = format!("Step {}/{}", i + 1, LONG_TASK_STEPS);
            ctx.report_progress(
                f64::from(i) / f64::from(LONG_TASK_STEPS),
                Some(1.0),
                Some(&message),
            )
            .await;
            tokio::time::sleep(self.step).await;
        }
        ctx.report_progress(1.0, Some(1.0), Some("Complete!")).await;

        Ok(format!(
            "Task \"{}\" completed successfully after {} steps!",
            task_name, LONG_TASK_STEPS
        )
        .into())
    }
}
