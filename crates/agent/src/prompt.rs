//! Prompt construction.
//!
//! A request is always shaped the same way:
//!
//! 1. one system message: preamble, tool catalog, output format, rules
//! 2. any prior context messages, unchanged and in order
//! 3. one user message: the task, followed by the scratchpad once there is one

use tether_core::{Message, ToolDescriptor};

use crate::scratchpad::render_steps;
use crate::StepRecord;

pub const DEFAULT_INSTRUCTIONS: &str = "You are Tether, an assistant that completes tasks inside a \
project directory by calling tools. Work step by step. Use tools to inspect the project instead \
of guessing about its contents.";

pub const OUTPUT_FORMAT: &str = "\
Reply in exactly one of these two shapes.

To use a tool:
Thought: <your reasoning about what to do next>
Action: <one tool name from the list above>
Action Input: <the input for that tool>

To finish:
Thought: <your reasoning>
Final Response: <your answer to the task>";

pub const OPERATING_RULES: &[&str] = &[
    "Call at most one tool per reply, then stop and wait for its Observation.",
    "Read a file before you modify or overwrite it.",
    "Only use tool names from the list above. Never invent a tool.",
    "Never write an Observation yourself. Observations come from the tools.",
];

/// Heading placed between the task and the scratchpad.
const SCRATCHPAD_HEADING: &str = "Steps so far:";

/// Renders the message sequence for one model call.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instructions: String,
    tools: Vec<ToolDescriptor>,
}

impl PromptBuilder {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            tools,
        }
    }

    /// Replace the instruction preamble.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// The system message text.
    pub fn system_text(&self) -> String {
        let mut out = String::new();
        out.push_str(self.instructions.trim_end());
        out.push_str("\n\nYou have access to the following tools:\n\n");
        for tool in &self.tools {
            out.push_str(&format!("{}: {}\n", tool.name, tool.description));
            if let Some(usage) = &tool.usage {
                for line in usage.lines() {
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out.push('\n');
        out.push_str(OUTPUT_FORMAT);
        out.push_str("\n\nRules:\n");
        for (i, rule) in OPERATING_RULES.iter().enumerate() {
            out.push_str(&format!("{}. {rule}\n", i + 1));
        }
        out
    }

    /// The final user message text: the task, then the steps taken so far.
    pub fn task_text(&self, task: &str, steps: &[StepRecord]) -> String {
        let scratchpad = render_steps(steps);
        if scratchpad.is_empty() {
            return task.to_string();
        }
        format!("{task}\n\n{SCRATCHPAD_HEADING}\n{scratchpad}")
    }

    /// Build the full ordered message sequence.
    pub fn build(&self, task: &str, steps: &[StepRecord], prior: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(prior.len() + 2);
        messages.push(Message::system(self.system_text()));
        messages.extend(prior.iter().cloned());
        messages.push(Message::user(self.task_text(task, steps)));
        messages
    }
}
