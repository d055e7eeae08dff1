// Copyright 2025 Apirelay (https://github.com/apirelay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Tool registry with JSON schema validation.
//!
//! Parameter schemas are compiled once at registration; invalid arguments
//! are rejected before a tool runs. Tool execution always produces a result
//! string, folding remote failures into formatted text.

use async_trait::async_trait;
use dashmap::DashMap;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Trait for tools exposed over MCP.
#[async_trait]
pub trait McpTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> &Value;

    /// Produce the tool's result string. Remote-service trouble must be
    /// folded into the string, never returned as an error; `Err` is reserved
    /// for malformed arguments that slipped past schema validation.
    async fn execute(&self, params: Value) -> Result<String, ToolError>;
}

/// Registry for MCP tools.
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn McpTool>>,
    validators: DashMap<String, JSONSchema>,
    order: parking_lot::Mutex<Vec<String>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            validators: DashMap::new(),
            order: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, tool: Arc<dyn McpTool>) -> Result<(), RegistrationError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistrationError::DuplicateName(name));
        }

        let schema = tool.input_schema().clone();
        let validator = JSONSchema::options()
            .compile(&schema)
            .map_err(|e| RegistrationError::Schema(e.to_string()))?;
        self.validators.insert(name.clone(), validator);
        self.order.lock().push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Tool descriptors in registration order.
    pub fn list(&self) -> Vec<ToolListEntry> {
        self.order
            .lock()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|entry| {
                let tool = entry.value();
                ToolListEntry {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    input_schema: tool.input_schema().clone(),
                }
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, params: Value) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?
            .value()
            .clone();
        let message = {
            let validator = self
                .validators
                .get(name)
                .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
            // Consume the error iterator while the map guard is live; it
            // borrows the guard and must not outlive this block.
            validator.validate(&params).err().map(|errors| {
                errors
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            })
        };
        if let Some(message) = message {
            return Err(ToolError::InvalidParams(message));
        }

        tool.execute(params).await
    }
}

#[derive(Debug, Clone)]
pub struct ToolListEntry {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
    #[error("Invalid tool params: {0}")]
    InvalidParams(String),
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Duplicate tool name: {0}")]
    DuplicateName(String),
    #[error("Invalid schema: {0}")]
    Schema(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool {
        schema: Value,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                schema: json!({
                    "type": "object",
                    "properties": {
                        "text": {"type": "string"}
                    },
                    "required": ["text"]
                }),
            }
        }
    }

    #[async_trait]
    impl McpTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the input text"
        }
        fn input_schema(&self) -> &Value {
            &self.schema
        }
        async fn execute(&self, params: Value) -> Result<String, ToolError> {
            Ok(params["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[tokio::test]
    async fn register_list_execute() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new())).unwrap();

        let listed = registry.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "echo");

        let out = registry
            .execute("echo", json!({"text": "hello"}))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn schema_validation_rejects_bad_params() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new())).unwrap();

        let err = registry.execute("echo", json!({})).await.unwrap_err();
        match err {
            ToolError::InvalidParams(message) => assert!(message.contains("text")),
            other => panic!("expected InvalidParams, got {other:?}"),
        }

        let err = registry
            .execute("echo", json!({"text": 42}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn unknown_and_duplicate_names() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new())).unwrap();

        assert!(matches!(
            registry.execute("nope", json!({})).await.unwrap_err(),
            ToolError::NotFound(_)
        ));
        assert!(matches!(
            registry.register(Arc::new(EchoTool::new())).unwrap_err(),
            RegistrationError::DuplicateName(_)
        ));
    }
}
