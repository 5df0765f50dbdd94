//! Tether CLI: the main entry point.
//!
//! Commands:
//! - `run`    : Run the agent on a task inside a project directory
//! - `exec`   : Execute a script in the sandbox
//! - `search` : Regex search over the project tree
//! - `tools`  : Print the tool catalog the model sees
//! - `init`   : Write the default config file
//! - `doctor` : Diagnose configuration and environment

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "tether",
    about = "Tether — a text-driven agent harness",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "TETHER_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent on a task
    Run {
        /// The task, in plain language
        task: String,

        /// Project root the tools are confined to (defaults to the current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Override agent.max_turns
        #[arg(long)]
        max_turns: Option<usize>,

        /// Print the system prompt before running
        #[arg(long)]
        show_prompt: bool,

        /// Print the run result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute a WAT or wasm script in the sandbox
    Exec {
        /// Path to the script file
        script: PathBuf,

        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Search the project tree with a regular expression
    Search {
        pattern: String,

        /// Sub-directory or file to search, relative to the root
        #[arg(long)]
        path: Option<String>,

        /// Regex flags, e.g. "i" or "im"
        #[arg(long)]
        flags: Option<String>,

        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// List the tools available to the agent
    Tools,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Diagnose configuration and environment
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only results
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Run {
            task,
            root,
            max_turns,
            show_prompt,
            json,
        } => {
            commands::run::run(commands::run::RunArgs {
                task,
                root,
                max_turns,
                show_prompt,
                json,
            })
            .await?
        }
        Commands::Exec { script, root } => commands::exec::run(script, root).await?,
        Commands::Search {
            pattern,
            path,
            flags,
            root,
        } => commands::search::run(pattern, path, flags, root).await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
