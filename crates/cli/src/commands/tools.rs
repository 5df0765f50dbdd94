//! `tether tools`: print the tool catalog, in prompt order.

use tether_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = tether_tools::default_registry(&config.tools)?;

    println!("Tools ({}):\n", registry.len());
    for tool in registry.descriptors() {
        println!("  {:<16} {}", tool.name, tool.description);
        if let Some(usage) = &tool.usage {
            for line in usage.lines() {
                println!("  {:<16} {line}", "");
            }
        }
        println!();
    }
    Ok(())
}
