//! MCP tool implementations.
//!
//! - `demo` - Greeting, simulated weather and a progress-reporting task
//! - `sampling` - Asks the client's language model a question
//! - `elicitation` - Requests confirmation and feedback from the user
//! - `bonus` - A calculator unlocked at runtime

pub mod bonus;
pub mod demo;
pub mod elicitation;
pub mod sampling;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::mcp::registry::CapabilityRegistry;

/// Delay between the steps of `long_task`.
pub const LONG_TASK_STEP: Duration = Duration::from_secs(1);

/// Register all tools with the registry.
pub fn register_all_tools(registry: &mut CapabilityRegistry, config: Arc<Config>) -> Result<()> {
    // Demo tools (3)
    registry.register_tool(demo::HelloTool::new(config))?;
    registry.register_tool(demo::GetWeatherTool::new())?;
    registry.register_tool(demo::LongTaskTool::new(LONG_TASK_STEP))?;

    // Sampling (1)
    registry.register_tool(sampling::AskLlmTool::new())?;

    // Dynamic loading (2)
    let gate = bonus::BonusGate::default();
    registry.register_tool(bonus::LoadBonusTool::new(gate.clone()))?;
    registry.register_tool(bonus::BonusCalculatorTool::new(gate))?;

    // Elicitation (2)
    registry.register_tool(elicitation::ConfirmActionTool::new())?;
    registry.register_tool(elicitation::GetFeedbackTool::new())?;

    Ok(())
}
