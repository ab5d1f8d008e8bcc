//! Tool Registry
//!
//! Manages tool registration, discovery, and execution.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use support_agent_core::{ToolCall, ToolDefinition};

use crate::{Tool, ToolError, ToolOutput};

/// Tool executor trait
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a model-requested tool call
    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError>;

    /// Schemas of every available tool
    fn definitions(&self) -> Vec<ToolDefinition>;
}

/// Tool registry
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    /// Execute a tool with timeout protection
    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::not_found(&call.name))?;

        let timeout_secs = tool.timeout_secs();
        let arguments = serde_json::Value::Object(
            call.arguments
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        tracing::debug!(
            tool = %call.name,
            call_id = %call.id,
            timeout_secs,
            "Executing tool"
        );

        match tokio::time::timeout(Duration::from_secs(timeout_secs), tool.execute(arguments)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ToolError::timeout(&call.name, timeout_secs)),
        }
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use support_agent_llm::ToolBuilder;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn definition(&self) -> ToolDefinition {
            ToolBuilder::new("echo", "Echo the text back")
                .param("text", "string", "Text", true)
                .build()
        }

        async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
            let text = crate::string_arg(&arguments, "text")
                .ok_or_else(|| ToolError::invalid_params("text is required"))?;
            Ok(ToolOutput::text(text))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn definition(&self) -> ToolDefinition {
            ToolBuilder::new("slow", "Never finishes in time").build()
        }

        async fn execute(&self, _arguments: Value) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ToolOutput::default())
        }

        fn timeout_secs(&self) -> u64 {
            1
        }
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: serde_json::from_value(arguments).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_execute_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let output = registry.execute(&call("echo", json!({"text": "selam"}))).await.unwrap();
        assert_eq!(output.content, "selam");

        let err = registry.execute(&call("echo", json!({}))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.execute(&call("missing", json!({}))).await.unwrap_err();
        assert_eq!(err.to_string(), "Tool not found: missing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowTool);
        let err = registry.execute(&call("slow", json!({}))).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { secs: 1, .. }));
    }

    #[test]
    fn test_definitions_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowTool);
        registry.register(EchoTool);
        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo", "slow"]);
        assert_eq!(registry.tool_names(), names);
    }
}
