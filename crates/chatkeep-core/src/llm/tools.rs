//! Tools the model may call while answering a prompt.
//!
//! A [`ToolRegistry`] holds the declarations advertised to the backend and
//! the implementations that run when the model asks for them. Tool failures
//! never abort a turn: they are handed back to the model as an `error`
//! payload so it can answer the user anyway.

use std::sync::Arc;

use chatkeep_types::llm::{FunctionCall, FunctionDeclaration, FunctionResponse};
use chrono::Utc;
use serde_json::{Value, json};

/// A function the model can invoke.
pub trait Tool: Send + Sync {
    /// Name, description, and argument schema sent to the backend.
    fn declaration(&self) -> FunctionDeclaration;

    /// Run the tool. `Err` carries a message the model will see.
    fn call(&self, args: &Value) -> Result<Value, String>;
}

/// Registered tools, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tools available out of the box.
    pub fn builtin() -> Self {
        Self::new().with(CurrentTime)
    }

    /// Register a tool, replacing any earlier tool with the same name.
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        let name = tool.declaration().name;
        self.tools.retain(|(existing, _)| *existing != name);
        self.tools.push((name, Arc::new(tool)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools.iter().map(|(_, tool)| tool.declaration()).collect()
    }

    /// Run the call and wrap the outcome for the model.
    ///
    /// Success is `{"result": ...}`; an unknown tool or a failing one is
    /// `{"error": "..."}`.
    pub fn invoke(&self, call: &FunctionCall) -> FunctionResponse {
        let outcome = match self.tools.iter().find(|(name, _)| *name == call.name) {
            Some((_, tool)) => tool.call(&call.args),
            None => Err(format!("unknown tool '{}'", call.name)),
        };

        let response = match outcome {
            Ok(result) => {
                tracing::info!(tool = %call.name, "Tool call completed");
                json!({ "result": result })
            }
            Err(message) => {
                tracing::warn!(tool = %call.name, error = %message, "Tool call failed");
                json!({ "error": message })
            }
        };

        FunctionResponse {
            name: call.name.clone(),
            response,
        }
    }
}

/// Reports the current UTC date and time.
pub struct CurrentTime;

impl Tool for CurrentTime {
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: "current_time".to_string(),
            description: "Get the current date and time in UTC (RFC 3339).".to_string(),
            parameters: None,
        }
    }

    fn call(&self, _args: &Value) -> Result<Value, String> {
        Ok(Value::String(Utc::now().to_rfc3339()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Divide;

    impl Tool for Divide {
        fn declaration(&self) -> FunctionDeclaration {
            FunctionDeclaration {
                name: "divide".to_string(),
                description: "Divide a by b.".to_string(),
                parameters: Some(json!({
                    "type": "OBJECT",
                    "properties": {"a": {"type": "NUMBER"}, "b": {"type": "NUMBER"}},
                    "required": ["a", "b"]
                })),
            }
        }

        fn call(&self, args: &Value) -> Result<Value, String> {
            let a = args["a"].as_f64().ok_or("a must be a number")?;
            let b = args["b"].as_f64().ok_or("b must be a number")?;
            if b == 0.0 {
                return Err("division by zero".to_string());
            }
            Ok(json!(a / b))
        }
    }

    fn call(name: &str, args: Value) -> FunctionCall {
        FunctionCall {
            name: name.to_string(),
            args,
        }
    }

    #[test]
    fn successful_call_is_wrapped_as_result() {
        let registry = ToolRegistry::new().with(Divide);
        let response = registry.invoke(&call("divide", json!({"a": 9, "b": 3})));
        assert_eq!(response.name, "divide");
        assert_eq!(response.response, json!({"result": 3.0}));
    }

    #[test]
    fn failures_are_reported_to_the_model() {
        let registry = ToolRegistry::new().with(Divide);

        let response = registry.invoke(&call("divide", json!({"a": 1, "b": 0})));
        assert_eq!(response.response, json!({"error": "division by zero"}));

        let response = registry.invoke(&call("teleport", json!({})));
        assert_eq!(response.name, "teleport");
        assert_eq!(response.response, json!({"error": "unknown tool 'teleport'"}));
    }

    #[test]
    fn registering_twice_replaces() {
        let registry = ToolRegistry::builtin().with(Divide).with(Divide);
        assert_eq!(registry.len(), 2);
        let names: Vec<String> = registry.declarations().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["current_time", "divide"]);
        assert!(ToolRegistry::new().is_empty());
    }

    #[test]
    fn current_time_is_rfc3339() {
        let response = ToolRegistry::builtin().invoke(&call("current_time", Value::Null));
        let stamp = response.response["result"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
