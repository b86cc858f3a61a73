//! Tool dispatch seam

use async_trait::async_trait;
use buddy_ai::FunctionDeclaration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Why a tool call produced no output
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolError {
    /// No tool with this name is registered; nothing was executed
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    /// Arguments were missing or mistyped; nothing was executed
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The tool ran and failed
    #[error("{message}")]
    Execution { message: String },
}

impl ToolError {
    pub fn invalid(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

/// Executes named tool calls with JSON arguments
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Declarations advertised to the model
    fn declarations(&self) -> Vec<FunctionDeclaration>;

    /// Validate and run one tool call.
    ///
    /// The returned output is raw and untruncated.
    async fn execute(&self, name: &str, args: serde_json::Value) -> Result<String, ToolError>;
}

/// Outcome of one dispatch, as fed back to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub output: String,
    pub error: Option<ToolError>,
}

impl ToolCallResult {
    /// Payload for the function response part
    pub fn to_response(&self) -> serde_json::Value {
        let mut response = serde_json::json!({ "output": self.output });
        if let Some(error) = &self.error {
            response["error"] = serde_json::Value::String(error.to_string());
        }
        response
    }
}

impl From<Result<String, ToolError>> for ToolCallResult {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(output) => Self {
                output,
                error: None,
            },
            Err(error) => Self {
                output: String::new(),
                error: Some(error),
            },
        }
    }
}

/// Compiled JSON Schema validators keyed by tool name
pub struct ArgumentValidator {
    validators: HashMap<String, jsonschema::Validator>,
}

impl ArgumentValidator {
    /// Compile a validator per declaration; declarations whose schema does
    /// not compile are skipped with a warning
    pub fn new(declarations: &[FunctionDeclaration]) -> Self {
        let mut validators = HashMap::new();
        for decl in declarations {
            match jsonschema::validator_for(&decl.parameters) {
                Ok(validator) => {
                    validators.insert(decl.name.clone(), validator);
                }
                Err(e) => {
                    tracing::warn!(tool = %decl.name, "Invalid tool schema, skipping validation: {}", e);
                }
            }
        }
        Self { validators }
    }

    /// Check `args` against the tool's schema
    pub fn validate(&self, tool: &str, args: &serde_json::Value) -> Result<(), ToolError> {
        let Some(validator) = self.validators.get(tool) else {
            return Ok(());
        };

        let errors: Vec<String> = validator
            .iter_errors(args)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ToolError::invalid(tool, errors.join("; ")))
        }
    }
}
