//! Integrations with no backend in this build. They stay in the catalog so
//! the model gets a clear answer instead of an unknown-tool failure.

use async_trait::async_trait;
use tether_core::{ExecutionContext, Tool, ToolError};

pub const NOT_CONFIGURED: &str = "Integration not configured";

pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Not configured in this environment."
    }

    async fn execute(&self, _input: &str, _ctx: &ExecutionContext) -> Result<String, ToolError> {
        Ok(NOT_CONFIGURED.into())
    }
}

pub struct KnowledgeBaseTool;

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        "knowledge_base"
    }

    fn description(&self) -> &str {
        "Query the team knowledge base. Not configured in this environment."
    }

    async fn execute(&self, _input: &str, _ctx: &ExecutionContext) -> Result<String, ToolError> {
        Ok(NOT_CONFIGURED.into())
    }
}
