//! `tether doctor`: diagnose configuration and environment.

use tether_config::AppConfig;
use tether_tools::Sandbox;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Tether Doctor");
    println!("================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file (defaults in use) — run `tether init`");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running other checks.");
            return Ok(());
        }
    };

    println!("  ℹ️  Provider: {}  Model: {}", config.provider, config.model);
    if config.provider == "ollama" {
        println!("  ✅ No API key needed for ollama");
    } else if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set TETHER_API_KEY or api_key in config.toml");
        issues += 1;
    }

    match Sandbox::new(config.tools.sandbox.clone()) {
        Ok(_) => println!("  ✅ Script sandbox initialises"),
        Err(e) => {
            println!("  ❌ Script sandbox unavailable: {e}");
            issues += 1;
        }
    }

    if config.tools.fetch.enabled {
        let curl = &config.tools.fetch.curl_path;
        match tokio::process::Command::new(curl).arg("--version").output().await {
            Ok(out) if out.status.success() => {
                let version = String::from_utf8_lossy(&out.stdout);
                let first = version.lines().next().unwrap_or_default();
                println!("  ✅ curl available: {first}");
            }
            Ok(out) => {
                println!("  ⚠️  `{curl} --version` exited with {}", out.status);
                issues += 1;
            }
            Err(e) => {
                println!("  ⚠️  curl not found ({curl}: {e}) — fetch_url will fail");
                issues += 1;
            }
        }
    } else {
        println!("  ℹ️  fetch_url disabled");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
