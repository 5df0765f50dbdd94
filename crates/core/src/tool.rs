//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act: list, read, and write
//! files under the project root, search the tree, run sandboxed scripts.
//! The model names a tool and passes it raw text; the tool interprets that
//! text itself.

use crate::context::ExecutionContext;
use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// What the model is told about a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: String,

    /// One-line description
    pub description: String,

    /// Optional guide describing the expected input shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

/// The core Tool trait.
///
/// Every capability implements this trait and is registered in the
/// [`ToolRegistry`]. A failing tool returns a [`ToolError`]; the agent loop
/// folds it into the next observation instead of ending the run.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// How to shape the `Action Input` for this tool.
    fn usage(&self) -> Option<&str> {
        None
    }

    /// Execute the tool with the raw action input.
    async fn execute(
        &self,
        input: &str,
        ctx: &ExecutionContext,
    ) -> std::result::Result<String, ToolError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            usage: self.usage().map(str::to_string),
        }
    }
}

/// A registry of available tools, keyed by name.
///
/// Built once from a fixed tool set; the catalog keeps registration order so
/// prompts are stable across runs.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a fixed set of tools.
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool. Replaces any existing tool with the same name while
    /// keeping its catalog position.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All descriptors, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.descriptor())
            .collect()
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn usage(&self) -> Option<&str> {
            Some("Action Input: any text")
        }
        async fn execute(
            &self,
            input: &str,
            _ctx: &ExecutionContext,
        ) -> std::result::Result<String, ToolError> {
            Ok(input.to_string())
        }
    }

    struct ShoutTool;

    #[async_trait]
    impl Tool for ShoutTool {
        fn name(&self) -> &str {
            "shout"
        }
        fn description(&self) -> &str {
            "Upper-cases the input"
        }
        async fn execute(
            &self,
            input: &str,
            _ctx: &ExecutionContext,
        ) -> std::result::Result<String, ToolError> {
            Ok(input.to_uppercase())
        }
    }

    fn ctx() -> (tempfile::TempDir, ExecutionContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::new(dir.path()).unwrap();
        (dir, ctx)
    }

    #[test]
    fn registry_register_and_lookup() {
        let registry = ToolRegistry::from_tools([Arc::new(EchoTool) as Arc<dyn Tool>]);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn descriptors_keep_registration_order() {
        let registry = ToolRegistry::from_tools([
            Arc::new(ShoutTool) as Arc<dyn Tool>,
            Arc::new(EchoTool),
        ]);
        let defs = registry.descriptors();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "shout");
        assert_eq!(defs[1].name, "echo");
        assert_eq!(defs[1].usage.as_deref(), Some("Action Input: any text"));
        assert!(defs[0].usage.is_none());
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(ShoutTool));
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.names(), vec!["echo", "shout"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn lookup_then_dispatch() {
        let (_dir, ctx) = ctx();
        let registry = ToolRegistry::from_tools([Arc::new(ShoutTool) as Arc<dyn Tool>]);
        let tool = registry.get("shout").unwrap();
        assert_eq!(tool.execute("quiet", &ctx).await.unwrap(), "QUIET");
    }
}
