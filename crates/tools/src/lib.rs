//! Built-in tool implementations for Tether.
//!
//! Tools give the agent the ability to work inside a project directory:
//! list, read and write files, search the tree, run sandboxed scripts, and
//! fetch URLs. Every path goes through `tether-security` confinement first.

pub mod fetch_url;
pub mod file_list;
pub mod file_read;
pub mod file_write;
pub mod payload;
pub mod placeholders;
pub mod run_script;
pub mod sandbox;
pub mod search;
pub mod text;

use std::sync::Arc;
use tether_config::ToolsConfig;
use tether_core::{Tool, ToolError, ToolRegistry};

pub use sandbox::{Sandbox, SandboxError, ScriptOutput, ScriptValue};
pub use search::{SearchEngine, SearchRequest};

/// Create the default tool registry from configuration.
///
/// Catalog order is the order tools appear in the prompt.
pub fn default_registry(config: &ToolsConfig) -> Result<ToolRegistry, ToolError> {
    let sandbox = Sandbox::new(config.sandbox.clone())?;

    let mut tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(file_list::ListFilesTool),
        Arc::new(file_read::ReadFileTool::new(
            config.read_max_bytes,
            config.read_max_chars,
        )),
        Arc::new(file_write::WriteFileTool),
        Arc::new(search::SearchFilesTool::new(config.search.clone())),
        Arc::new(run_script::RunScriptTool::new(Arc::new(sandbox))),
    ];
    if config.fetch.enabled {
        tools.push(Arc::new(fetch_url::FetchUrlTool::new(config.fetch.clone())));
    }
    tools.push(Arc::new(placeholders::WebSearchTool));
    tools.push(Arc::new(placeholders::KnowledgeBaseTool));

    Ok(ToolRegistry::from_tools(tools))
}
