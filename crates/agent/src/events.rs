//! Run progress events.
//!
//! An [`AgentLoop`](crate::AgentLoop) given a sender emits these as the run
//! advances, so a host can render steps while the run is still going.
//! Sending never blocks the loop: if the receiver is gone the event is
//! dropped.

use serde::{Deserialize, Serialize};

use crate::loop_runner::RunOutcome;
use crate::scratchpad::StepRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A model call is about to be made. `turn` counts from zero.
    TurnStarted { turn: usize },

    /// A step was appended to the scratchpad.
    StepRecorded { index: usize, step: StepRecord },

    /// The run ended without an error.
    Finished { outcome: RunOutcome, turns: usize },
}

impl RunEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TurnStarted { .. } => "turn_started",
            Self::StepRecorded { .. } => "step_recorded",
            Self::Finished { .. } => "finished",
        }
    }
}
