//! The Tether agent loop.
//!
//! A run follows a **Thought → Action → Observation** cycle over plain text:
//!
//! 1. **Prompt**: system instructions and tool catalog, prior context, then
//!    the task with every step taken so far
//! 2. **Ask** the model through the configured [`Provider`](tether_core::Provider)
//! 3. **Parse** the reply into an action or a final answer
//! 4. **Act**: run the named tool and record what it returned
//! 5. Loop until a final answer, the turn limit, or cancellation
//!
//! Tool failures are shown to the model as observations so it can recover.
//! An unknown tool name or an unparsable reply ends the run with an error.

pub mod events;
pub mod loop_runner;
pub mod parser;
pub mod prompt;
pub mod scratchpad;
pub mod supervisor;

#[cfg(test)]
mod test_helpers;

pub use events::RunEvent;
pub use loop_runner::{
    ABORTED_MESSAGE, AgentLoop, EXHAUSTED_MESSAGE, RunOutcome, RunResult, STOP_SEQUENCE,
    TOOL_FAILURE_PREFIX,
};
pub use parser::{ParsedResponse, parse_response};
pub use prompt::PromptBuilder;
pub use scratchpad::{Scratchpad, StepRecord};
pub use supervisor::RunSupervisor;
