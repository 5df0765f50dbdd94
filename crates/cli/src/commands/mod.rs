pub mod doctor;
pub mod exec;
pub mod init;
pub mod run;
pub mod search;
pub mod tools;

use std::path::PathBuf;
use tether_config::AppConfig;
use tether_core::ExecutionContext;

/// Build the per-invocation context: the root (default: current directory)
/// and the configured environment overrides.
pub fn context(
    root: Option<PathBuf>,
    config: &AppConfig,
) -> Result<ExecutionContext, Box<dyn std::error::Error>> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let ctx = ExecutionContext::new(&root)
        .map_err(|e| format!("Invalid project root {}: {e}", root.display()))?;
    Ok(ctx.with_env(config.tools.env.clone()))
}
