//! `tether search`: the agent's `search_files` engine, run directly.

use std::path::PathBuf;
use tether_config::AppConfig;
use tether_tools::{SearchEngine, SearchRequest};

pub async fn run(
    pattern: String,
    path: Option<String>,
    flags: Option<String>,
    root: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let ctx = super::context(root, &config)?;

    let engine = SearchEngine::new(config.tools.search.clone());
    let output = engine
        .search(
            &SearchRequest {
                pattern,
                path,
                flags,
            },
            &ctx,
        )
        .await?;

    println!("{output}");
    Ok(())
}
