//! `tether run`: drive the agent on one task.
//!
//! Steps are printed to stderr as they are recorded; the final output goes to
//! stdout. Ctrl-C cancels the run, which then reports as aborted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tether_agent::{AgentLoop, RunEvent, RunOutcome, RunSupervisor, StepRecord};
use tether_config::AppConfig;
use tokio::sync::mpsc;

/// Longest observation echoed to the terminal per step.
const OBSERVATION_PREVIEW_CHARS: usize = 600;

pub struct RunArgs {
    pub task: String,
    pub root: Option<PathBuf>,
    pub max_turns: Option<usize>,
    pub show_prompt: bool,
    pub json: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = tether_providers::build_from_config(&config).map_err(|e| {
        format!(
            "{e}\n\n  Set TETHER_API_KEY (or OPENROUTER_API_KEY / OPENAI_API_KEY),\n  \
             or run `tether init` and edit {}",
            AppConfig::config_path().display()
        )
    })?;
    let tools = Arc::new(tether_tools::default_registry(&config.tools)?);
    let ctx = super::context(args.root, &config)?;

    let (tx, mut rx) = mpsc::channel(64);
    let mut agent = AgentLoop::new(provider, tools, config.model.clone())
        .with_max_turns(args.max_turns.unwrap_or(config.agent.max_turns as usize))
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_tool_timeout(Duration::from_secs(config.agent.tool_timeout_secs))
        .with_events(tx);
    if let Some(instructions) = &config.agent.instructions {
        agent = agent.with_instructions(instructions.clone());
    }

    if args.show_prompt {
        eprintln!("── System prompt ──\n{}", agent.prompt().system_text());
    }

    let supervisor = RunSupervisor::new(Arc::new(agent));
    let run = supervisor.submit(&args.task, &[], &ctx);
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            Some(event) = rx.recv() => print_event(&event),
            Ok(()) = tokio::signal::ctrl_c() => {
                eprintln!("\n  Interrupt received, cancelling the run...");
                supervisor.cancel_active();
            }
        }
    };
    while let Ok(event) = rx.try_recv() {
        print_event(&event);
    }

    let result = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match result.outcome {
        RunOutcome::Completed => println!("{}", result.output),
        RunOutcome::Exhausted | RunOutcome::Aborted => {
            eprintln!("  [{:?}] {}", result.outcome, result.output);
        }
    }
    Ok(())
}

fn print_event(event: &RunEvent) {
    match event {
        RunEvent::TurnStarted { turn } => {
            tracing::debug!(turn, "Waiting for the model");
        }
        RunEvent::StepRecorded { index, step } => print_step(*index, step),
        RunEvent::Finished { outcome, turns } => {
            eprintln!("── Finished: {outcome:?} after {turns} turn(s) ──");
        }
    }
}

fn print_step(index: usize, step: &StepRecord) {
    eprintln!("── Step {} ──", index + 1);
    if !step.thought.is_empty() {
        eprintln!("  Thought: {}", step.thought);
    }
    if let Some((tool, input)) = &step.action {
        eprintln!("  Action:  {tool}");
        for line in input.lines() {
            eprintln!("    {line}");
        }
    }
    if let Some(observation) = &step.observation {
        eprintln!("  Observation:");
        for line in preview(observation).lines() {
            eprintln!("    {line}");
        }
    }
}

fn preview(text: &str) -> String {
    tether_tools::text::truncate_chars(text, OBSERVATION_PREVIEW_CHARS)
}
