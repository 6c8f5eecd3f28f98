//! Dynamic tool loading.
//!
//! `bonus_calculator` is registered at startup but stays hidden from
//! `tools/list` (and uncallable) until `load_bonus_tool` opens the gate.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::error::{Error, Result};
use crate::mcp::context::InvocationContext;
use crate::mcp::handler::{get_number_arg, get_string_arg, Arguments, ToolHandler, ToolOutput};
use crate::mcp::protocol::{Tool, ToolAnnotations};

/// Shared flag recording whether the bonus tool has been loaded.
#[derive(Debug, Clone, Default)]
pub struct BonusGate(Arc<AtomicBool>);

impl BonusGate {
    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Open the gate. Returns `false` if it was already open.
    pub fn open(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}

/// Unlocks `bonus_calculator`.
pub struct LoadBonusTool {
    gate: BonusGate,
}

impl LoadBonusTool {
    pub fn new(gate: BonusGate) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl ToolHandler for LoadBonusTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "load_bonus_tool".to_string(),
            title: None,
            description: "Dynamically loads a bonus tool that wasn't available at startup."
                .to_string(),
            input_schema: crate::tool_schema!(),
            output_schema: None,
            // Modifies server state, but loading twice is safe.
            annotations: Some(
                ToolAnnotations::with_title("Load Bonus Tool")
                    .read_only(false)
                    .destructive(false)
                    .idempotent(true)
                    .open_world(false),
            ),
        }
    }

    async fn execute(&self, _args: Arguments, ctx: &InvocationContext) -> Result<ToolOutput> {
        if !self.gate.open() {
            return Ok("Bonus tool is already loaded! Try calling 'bonus_calculator'.".into());
        }

        info!("Loaded bonus_calculator");
        ctx.peer().notify_tool_list_changed().await;
        Ok(
            "Bonus tool 'bonus_calculator' has been loaded! Refresh your tools list to see it."
                .into(),
        )
    }
}

/// Calculator operations.
const OPERATIONS: [&str; 4] = ["add", "subtract", "multiply", "divide"];

/// A calculator that only appears after `load_bonus_tool`.
pub struct BonusCalculatorTool {
    gate: BonusGate,
}

impl BonusCalculatorTool {
    pub fn new(gate: BonusGate) -> Self {
        Self { gate }
    }
}

/// Apply `operation` to the operands. Division by zero yields NaN.
pub fn calculate(a: f64, b: f64, operation: &str) -> Result<f64> {
    match operation {
        "add" => Ok(a + b),
        "subtract" => Ok(a - b),
        "multiply" => Ok(a * b),
        "divide" if b == 0.0 => Ok(f64::NAN),
        "divide" => Ok(a / b),
        other => Err(Error::invalid_field(
            "operation",
            format!("unknown operation '{}'", other),
        )),
    }
}

#[async_trait]
impl ToolHandler for BonusCalculatorTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "bonus_calculator".to_string(),
            title: None,
            description: "A calculator that was dynamically loaded.".to_string(),
            input_schema: crate::tool_schema!(
                required: ["a", "b", "operation"],
                "a": {
                    "type": "number",
                    "description": "First number"
                },
                "b": {
                    "type": "number",
                    "description": "Second number"
                },
                "operation": {
                    "type": "string",
                    "description": "Mathematical operation to perform",
                    "enum": OPERATIONS
                }
            ),
            output_schema: None,
            annotations: Some(
                ToolAnnotations::with_title("Bonus Calculator")
                    .read_only(true)
                    .destructive(false)
                    .idempotent(true)
                    .open_world(false),
            ),
        }
    }

    fn is_available(&self) -> bool {
        self.gate.is_open()
    }

    async fn execute(&self, args: Arguments, _ctx: &InvocationContext) -> Result<ToolOutput> {
        let a = get_number_arg(&args, "a")?;
        let b = get_number_arg(&args, "b")?;
        let operation = get_string_arg(&args, "operation")?;
        let result = calculate(a, b, &operation)?;
        Ok(format!("{} {} {} = {}", a, operation, b, result).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::context::test_context;
    use crate::mcp::transport::Message;
    use serde_json::json;

    #[test]
    fn test_gate_opens_once() {
        let gate = BonusGate::default();
        assert!(!gate.is_open());
        assert!(gate.open());
        assert!(!gate.open());
        assert!(gate.clone().is_open());
    }

    #[test]
    fn test_calculate() {
        assert_eq!(calculate(2.0, 3.0, "add").unwrap(), 5.0);
        assert_eq!(calculate(2.0, 3.0, "subtract").unwrap(), -1.0);
        assert_eq!(calculate(2.0, 3.0, "multiply").unwrap(), 6.0);
        assert_eq!(calculate(3.0, 2.0, "divide").unwrap(), 1.5);
        assert!(calculate(1.0, 0.0, "divide").unwrap().is_nan());
        assert!(calculate(1.0, 1.0, "modulo").is_err());
    }

    #[tokio::test]
    async fn test_load_announces_list_change_once() {
        let gate = BonusGate::default();
        let calculator = BonusCalculatorTool::new(gate.clone());
        let loader = LoadBonusTool::new(gate);
        assert!(!calculator.is_available());

        let (ctx, mut rx) = test_context(None);
        let first = loader.execute(Arguments::new(), &ctx).await.unwrap();
        let second = loader.execute(Arguments::new(), &ctx).await.unwrap();
        drop(ctx);

        assert_eq!(
            first,
            ToolOutput::from(
                "Bonus tool 'bonus_calculator' has been loaded! Refresh your tools list to see it."
            )
        );
        assert_eq!(
            second,
            ToolOutput::from("Bonus tool is already loaded! Try calling 'bonus_calculator'.")
        );
        assert!(calculator.is_available());

        match rx.recv().await.unwrap() {
            Message::Notification(n) => assert_eq!(n.method, "notifications/tools/list_changed"),
            other => panic!("Expected notification, got {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_calculator_output() {
        let (ctx, _rx) = test_context(None);
        let mut args = Arguments::new();
        args.insert("a".to_string(), json!(7));
        args.insert("b".to_string(), json!(2));
        args.insert("operation".to_string(), json!("divide"));

        let output = BonusCalculatorTool::new(BonusGate::default())
            .execute(args.clone(), &ctx)
            .await
            .unwrap();
        assert_eq!(output, ToolOutput::from("7 divide 2 = 3.5"));

        args.insert("b".to_string(), json!(0));
        let output = BonusCalculatorTool::new(BonusGate::default())
            .execute(args, &ctx)
            .await
            .unwrap();
        assert_eq!(output, ToolOutput::from("7 divide 0 = NaN"));
    }
}
