//! Scratchpad: the append-only record of one run's steps.
//!
//! Each step holds what the model said and, for actions, what the tool
//! returned. The rendered text is what the model sees of its own history on
//! the next turn, so it is derived from the step list alone and never edited
//! in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (thought, action, observation) step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub thought: String,

    /// `(tool name, raw input)` when the model asked for a tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<(String, String)>,

    /// Tool output, or the failure text when the tool errored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,

    /// The unmodified model reply this step was parsed from.
    pub raw: String,

    pub timestamp: DateTime<Utc>,
}

impl StepRecord {
    /// A step that ended the run with a final answer.
    pub fn final_step(thought: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            action: None,
            observation: None,
            raw: raw.into(),
            timestamp: Utc::now(),
        }
    }

    /// A tool step, with the observation that came back.
    pub fn action_step(
        thought: impl Into<String>,
        tool: impl Into<String>,
        input: impl Into<String>,
        observation: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            thought: thought.into(),
            action: Some((tool.into(), input.into())),
            observation: Some(observation.into()),
            raw: raw.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn tool(&self) -> Option<&str> {
        self.action.as_ref().map(|(tool, _)| tool.as_str())
    }

    fn render_into(&self, out: &mut String) {
        if !self.thought.is_empty() {
            out.push_str(&format!("Thought: {}\n", self.thought));
        }
        if let Some((tool, input)) = &self.action {
            out.push_str(&format!("Action: {tool}\n"));
            out.push_str(&format!("Action Input: {input}\n"));
        }
        if let Some(observation) = &self.observation {
            out.push_str(&format!("Observation: {observation}\n"));
        }
    }
}

/// Ordered steps of a single run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scratchpad {
    steps: Vec<StepRecord>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<StepRecord> {
        self.steps
    }

    /// Render the steps in order as the text appended to the next prompt.
    /// Empty scratchpad renders as the empty string.
    pub fn render(&self) -> String {
        render_steps(&self.steps)
    }
}

/// Fold a step sequence into prompt text.
pub fn render_steps(steps: &[StepRecord]) -> String {
    let mut out = String::new();
    for step in steps {
        step.render_into(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_renders_empty() {
        assert_eq!(Scratchpad::new().render(), "");
    }

    #[test]
    fn render_preserves_order() {
        let mut pad = Scratchpad::new();
        pad.push(StepRecord::action_step(
            "look around",
            "list_files",
            ".",
            "src/",
            "raw 1",
        ));
        pad.push(StepRecord::action_step(
            "read it",
            "read_file",
            "src/main.rs",
            "fn main() {}",
            "raw 2",
        ));

        assert_eq!(
            pad.render(),
            "Thought: look around\nAction: list_files\nAction Input: .\nObservation: src/\n\
             Thought: read it\nAction: read_file\nAction Input: src/main.rs\nObservation: fn main() {}\n"
        );
    }

    #[test]
    fn render_is_pure() {
        let mut pad = Scratchpad::new();
        pad.push(StepRecord::action_step("t", "x", "y", "z", "raw"));
        assert_eq!(pad.render(), pad.render());
        assert_eq!(pad.render(), render_steps(pad.steps()));
    }

    #[test]
    fn final_step_has_no_action() {
        let step = StepRecord::final_step("ok", "Thought: ok\nFinal Response: done");
        assert!(step.action.is_none());
        assert!(step.observation.is_none());
        assert_eq!(step.tool(), None);
    }

    #[test]
    fn empty_thought_omitted() {
        let step = StepRecord::action_step("", "read_file", "a.txt", "hi", "raw");
        assert_eq!(
            render_steps(&[step]),
            "Action: read_file\nAction Input: a.txt\nObservation: hi\n"
        );
    }
}
