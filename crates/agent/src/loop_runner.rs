//! The agent reasoning loop.
//!
//! One run is a small state machine:
//!
//! ```text
//! Running{0} ─▶ Running{1} ─▶ … ─▶ Completed | Exhausted | Aborted | Failed
//! ```
//!
//! Each turn builds the prompt, waits on the model, parses the reply and, for
//! an action, waits on the tool. Those two waits are the only places the run
//! suspends, and both give way to the context's cancellation token.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{
    AgentError, ExecutionContext, Message, Provider, ProviderRequest, Tool, ToolError,
    ToolRegistry,
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::events::RunEvent;
use crate::parser::{ParsedResponse, parse_response};
use crate::prompt::PromptBuilder;
use crate::scratchpad::{Scratchpad, StepRecord};

pub const DEFAULT_MAX_TURNS: usize = 8;
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Output of a run that used every turn without a final answer.
pub const EXHAUSTED_MESSAGE: &str =
    "Stopped before reaching a final answer: the maximum number of steps was used.";

/// Output of a run that was cancelled.
pub const ABORTED_MESSAGE: &str = "Run aborted before it finished.";

/// Prefix of the observation recorded when a tool returns an error.
pub const TOOL_FAILURE_PREFIX: &str = "Tool execution failed: ";

/// Sent with every request so the model stops instead of inventing a result.
pub const STOP_SEQUENCE: &str = "\nObservation:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Exhausted,
    Aborted,
}

/// Everything a finished run hands back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub output: String,
    pub steps: Vec<StepRecord>,
    pub outcome: RunOutcome,
    /// Model replies received.
    pub turns: usize,
}

enum RunState {
    Running { turn: usize },
    Done(Finish),
}

enum Finish {
    Completed { output: String, turns: usize },
    Exhausted { turns: usize },
    Aborted { turns: usize },
    Failed(AgentError),
}

impl From<Finish> for RunState {
    fn from(finish: Finish) -> Self {
        RunState::Done(finish)
    }
}

/// Drives a model and a tool set through one task at a time.
pub struct AgentLoop {
    /// The model client
    provider: Arc<dyn Provider>,

    /// Tools the model may call; fixed for the life of the loop
    tools: Arc<ToolRegistry>,

    /// Renders the system message, prior context and scratchpad
    prompt: PromptBuilder,

    /// The model to request
    model: String,

    temperature: f32,
    max_tokens: Option<u32>,

    /// Hard cap on model calls per run
    max_turns: usize,

    /// Upper bound on a single tool call
    tool_timeout: Duration,

    /// Optional progress channel
    events: Option<mpsc::Sender<RunEvent>>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
    ) -> Self {
        let prompt = PromptBuilder::new(tools.descriptors());
        Self {
            provider,
            tools,
            prompt,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            max_turns: DEFAULT_MAX_TURNS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            events: None,
        }
    }

    /// Set the maximum number of turns per run.
    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per model reply.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Replace the instruction preamble of the system message.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.prompt = self.prompt.with_instructions(instructions);
        self
    }

    /// Bound each tool call. A call that runs longer is observed as a timeout.
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Emit [`RunEvent`]s on `tx` as the run progresses.
    pub fn with_events(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn prompt(&self) -> &PromptBuilder {
        &self.prompt
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Run `task` to completion.
    ///
    /// `prior` is inserted between the system message and the task on every
    /// turn. Running out of turns and cancellation are outcomes, not errors;
    /// only an unparsable reply, an unknown tool, or a model client failure
    /// return `Err`.
    pub async fn run(
        &self,
        task: &str,
        prior: &[Message],
        ctx: &ExecutionContext,
    ) -> Result<RunResult, AgentError> {
        let run_id = Uuid::new_v4();
        self.drive(run_id, task, prior, ctx)
            .instrument(info_span!("agent_run", %run_id))
            .await
    }

    async fn drive(
        &self,
        run_id: Uuid,
        task: &str,
        prior: &[Message],
        ctx: &ExecutionContext,
    ) -> Result<RunResult, AgentError> {
        info!(
            model = %self.model,
            max_turns = self.max_turns,
            tools = self.tools.len(),
            root = %ctx.root().display(),
            "Agent run starting"
        );

        let mut pad = Scratchpad::new();
        let mut state = RunState::Running { turn: 0 };

        let finish = loop {
            match state {
                RunState::Running { turn } if turn >= self.max_turns => {
                    break Finish::Exhausted { turns: turn };
                }
                RunState::Running { turn } => {
                    state = self.turn(turn, task, prior, ctx, &mut pad).await;
                }
                RunState::Done(finish) => break finish,
            }
        };

        let (output, outcome, turns) = match finish {
            Finish::Completed { output, turns } => (output, RunOutcome::Completed, turns),
            Finish::Exhausted { turns } => {
                warn!(turns, "Agent run exhausted its turn budget");
                (EXHAUSTED_MESSAGE.to_string(), RunOutcome::Exhausted, turns)
            }
            Finish::Aborted { turns } => {
                info!(turns, "Agent run aborted");
                (ABORTED_MESSAGE.to_string(), RunOutcome::Aborted, turns)
            }
            Finish::Failed(e) => {
                error!(error = %e, steps = pad.len(), "Agent run failed");
                return Err(e);
            }
        };

        info!(?outcome, turns, steps = pad.len(), "Agent run finished");
        self.emit(RunEvent::Finished { outcome, turns });

        Ok(RunResult {
            run_id,
            output,
            steps: pad.into_steps(),
            outcome,
            turns,
        })
    }

    async fn turn(
        &self,
        turn: usize,
        task: &str,
        prior: &[Message],
        ctx: &ExecutionContext,
        pad: &mut Scratchpad,
    ) -> RunState {
        if ctx.is_cancelled() {
            return Finish::Aborted { turns: turn }.into();
        }

        debug!(turn, "Agent turn");
        self.emit(RunEvent::TurnStarted { turn });

        let request = ProviderRequest {
            model: self.model.clone(),
            messages: self.prompt.build(task, pad.steps(), prior),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: vec![STOP_SEQUENCE.to_string()],
        };

        let response = tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => return Finish::Aborted { turns: turn }.into(),
            response = self.provider.complete(request) => response,
        };
        let raw = match response {
            Ok(response) => response.message.content,
            Err(e) => return Finish::Failed(e.into()).into(),
        };

        let parsed = match parse_response(&raw) {
            Ok(parsed) => parsed,
            Err(e) => return Finish::Failed(e).into(),
        };

        match parsed {
            ParsedResponse::Final { thought, output } => {
                self.record(pad, StepRecord::final_step(thought, raw));
                Finish::Completed {
                    output,
                    turns: turn + 1,
                }
                .into()
            }
            ParsedResponse::Action {
                thought,
                tool,
                input,
            } => {
                let Some(handle) = self.tools.get(&tool) else {
                    return Finish::Failed(AgentError::UnknownTool {
                        name: tool,
                        available: self.tools.names().into_iter().map(String::from).collect(),
                    })
                    .into();
                };

                let observation = match self.invoke(handle.as_ref(), &input, ctx).await {
                    Ok(output) => output,
                    Err(ToolError::Cancelled) => return Finish::Aborted { turns: turn + 1 }.into(),
                    Err(e) => {
                        warn!(tool = %tool, error = %e, "Tool call failed");
                        format!("{TOOL_FAILURE_PREFIX}{e}")
                    }
                };

                self.record(
                    pad,
                    StepRecord::action_step(thought, tool, input, observation, raw),
                );
                RunState::Running { turn: turn + 1 }
            }
        }
    }

    async fn invoke(
        &self,
        tool: &dyn Tool,
        input: &str,
        ctx: &ExecutionContext,
    ) -> Result<String, ToolError> {
        debug!(tool = tool.name(), input_len = input.len(), "Invoking tool");
        let start = std::time::Instant::now();

        let result = tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => Err(ToolError::Cancelled),
            res = tokio::time::timeout(self.tool_timeout, tool.execute(input, ctx)) => {
                res.unwrap_or_else(|_| {
                    Err(ToolError::Timeout {
                        tool_name: tool.name().to_string(),
                        timeout_secs: self.tool_timeout.as_secs(),
                    })
                })
            }
        };

        debug!(
            tool = tool.name(),
            ok = result.is_ok(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tool returned"
        );
        result
    }

    fn record(&self, pad: &mut Scratchpad, step: StepRecord) {
        let index = pad.len();
        if self.events.is_some() {
            self.emit(RunEvent::StepRecorded {
                index,
                step: step.clone(),
            });
        }
        pad.push(step);
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events
            && let Err(e) = tx.try_send(event)
        {
            debug!("Run event dropped: {e}");
        }
    }
}
