//! Argument validation against a tool's declared input schema.
//!
//! Schemas are compiled once at registration; every call is checked
//! against the compiled validator and all violations are reported together.

use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde_json::Value;

use crate::error::{Error, FieldError, Result};
use crate::mcp::handler::Arguments;

/// Field name used when a violation concerns the arguments object itself.
const ROOT_FIELD: &str = "arguments";

/// A compiled tool input schema.
pub struct ArgumentValidator {
    validator: Validator,
}

impl ArgumentValidator {
    /// Compile `schema`, failing if it is not a valid JSON Schema.
    pub fn compile(tool: &str, schema: &Value) -> Result<Self> {
        let validator = jsonschema::validator_for(schema).map_err(|e| Error::InvalidSchema {
            name: tool.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { validator })
    }

    /// Validate `args`, reporting every offending field.
    pub fn validate(&self, args: &Arguments) -> Result<()> {
        let instance = Value::Object(
            args.iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        );
        if self.validator.is_valid(&instance) {
            return Ok(());
        }

        let mut fields: Vec<FieldError> = self
            .validator
            .iter_errors(&instance)
            .map(|error| FieldError::new(field_of(&error), error.to_string()))
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        if fields.is_empty() {
            fields.push(FieldError::new(ROOT_FIELD, "does not match the input schema"));
        }
        Err(Error::Validation { fields })
    }
}

/// The argument a violation points at, as a dotted path.
fn field_of(error: &ValidationError<'_>) -> String {
    match &error.kind {
        ValidationErrorKind::Required { property } => match property {
            Value::String(name) => return name.clone(),
            other => return other.to_string(),
        },
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            return unexpected.join(", ");
        }
        _ => {}
    }

    let pointer = error.instance_path.to_string();
    let path: Vec<String> = pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect();
    if path.is_empty() {
        ROOT_FIELD.to_string()
    } else {
        path.join(".")
    }
}
