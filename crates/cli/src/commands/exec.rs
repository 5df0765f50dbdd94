//! `tether exec`: run a script through the same sandbox the agent uses.

use std::path::PathBuf;
use tether_config::AppConfig;
use tether_tools::Sandbox;

pub async fn run(script: PathBuf, root: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let source = std::fs::read(&script)
        .map_err(|e| format!("Cannot read script {}: {e}", script.display()))?;

    let ctx = super::context(root, &config)?;
    let sandbox = Sandbox::new(config.tools.sandbox.clone())?;

    let token = ctx.cancellation().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = sandbox.run_for_output(&source, &ctx).await;
    interrupt.abort();

    println!("{}", result?);
    Ok(())
}
