//! Model reply parsing.
//!
//! The model answers in a labelled text format:
//!
//! ```text
//! Thought: <reasoning>
//! Action: <tool name>
//! Action Input: <tool payload>
//! ```
//!
//! or
//!
//! ```text
//! Thought: <reasoning>
//! Final Response: <answer>
//! ```
//!
//! Labels count only at the start of a line (after optional indentation) and
//! match case-insensitively. A final answer wins over an action when both are
//! present. Anything after a hallucinated `Observation:` is not part of the
//! action input.

use serde::{Deserialize, Serialize};
use tether_core::AgentError;

/// A classified model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedResponse {
    Action {
        thought: String,
        tool: String,
        input: String,
    },
    Final {
        thought: String,
        output: String,
    },
}

impl ParsedResponse {
    pub fn thought(&self) -> &str {
        match self {
            Self::Action { thought, .. } | Self::Final { thought, .. } => thought,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Thought,
    Final,
    Action,
    ActionInput,
    Observation,
}

/// Longer spellings first so `Action Input` is not read as `Action`.
const LABELS: &[(&str, Label)] = &[
    ("final response", Label::Final),
    ("final answer", Label::Final),
    ("final", Label::Final),
    ("action input", Label::ActionInput),
    ("action", Label::Action),
    ("thought", Label::Thought),
    ("observation", Label::Observation),
];

#[derive(Debug, Clone, Copy)]
struct Marker {
    label: Label,
    /// Byte offset of the line the label sits on.
    line_start: usize,
    /// Byte offset just past the label's colon.
    body_start: usize,
}

/// Parse a raw model reply.
pub fn parse_response(raw: &str) -> Result<ParsedResponse, AgentError> {
    let markers = scan(raw);
    let thought = markers
        .iter()
        .position(|m| m.label == Label::Thought)
        .map(|i| section(raw, &markers, i).trim().to_string())
        .unwrap_or_default();

    if let Some(fin) = markers.iter().find(|m| m.label == Label::Final) {
        return Ok(ParsedResponse::Final {
            thought,
            output: raw[fin.body_start..].trim().to_string(),
        });
    }

    if let Some((tool, input)) = action(raw, &markers) {
        return Ok(ParsedResponse::Action {
            thought,
            tool,
            input,
        });
    }

    Err(AgentError::UnparsableResponse {
        raw: raw.to_string(),
    })
}

fn action(raw: &str, markers: &[Marker]) -> Option<(String, String)> {
    let action_idx = markers.iter().position(|m| m.label == Label::Action)?;
    let input_idx = markers
        .iter()
        .skip(action_idx + 1)
        .position(|m| m.label == Label::ActionInput)
        .map(|i| i + action_idx + 1)?;

    let after_action = &raw[markers[action_idx].body_start..];
    let tool = after_action
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches('`')
        .trim();
    if tool.is_empty() {
        return None;
    }

    let input_start = markers[input_idx].body_start;
    let input_end = markers
        .iter()
        .skip(input_idx + 1)
        .find(|m| m.label == Label::Observation)
        .map_or(raw.len(), |m| m.line_start);

    Some((
        tool.to_string(),
        raw[input_start..input_end].trim().to_string(),
    ))
}

/// Text belonging to marker `i`: up to the next label's line, or the end.
fn section<'a>(raw: &'a str, markers: &[Marker], i: usize) -> &'a str {
    let end = markers.get(i + 1).map_or(raw.len(), |m| m.line_start);
    &raw[markers[i].body_start..end]
}

fn scan(raw: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        if let Some((label, body)) = label_at(line) {
            markers.push(Marker {
                label,
                line_start: offset,
                body_start: offset + body,
            });
        }
        offset += line.len();
    }
    markers
}

/// If `line` opens with a label, return it and the offset just past its colon.
fn label_at(line: &str) -> Option<(Label, usize)> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let indent = line.len() - trimmed.len();

    LABELS.iter().find_map(|(name, label)| {
        let head = trimmed.get(..name.len())?;
        if !head.eq_ignore_ascii_case(name) {
            return None;
        }
        let rest = &trimmed[name.len()..];
        let after_space = rest.trim_start_matches([' ', '\t']);
        after_space.strip_prefix(':')?;
        let colon = indent + name.len() + (rest.len() - after_space.len()) + 1;
        Some((*label, colon))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(tool: &str, input: &str) -> (String, String) {
        (tool.to_string(), input.to_string())
    }

    fn as_action(parsed: ParsedResponse) -> (String, String) {
        match parsed {
            ParsedResponse::Action { tool, input, .. } => (tool, input),
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn final_response() {
        let parsed = parse_response("Thought: ok\nFinal Response: done").unwrap();
        assert_eq!(
            parsed,
            ParsedResponse::Final {
                thought: "ok".into(),
                output: "done".into()
            }
        );
    }

    #[test]
    fn final_aliases_and_case() {
        for raw in [
            "final answer: 42",
            "FINAL: 42",
            "  Final Response :   42  ",
            "Thought: x\n\tfinal answer:\n42\n",
        ] {
            match parse_response(raw).unwrap() {
                ParsedResponse::Final { output, .. } => assert_eq!(output, "42", "{raw}"),
                other => panic!("{raw}: {other:?}"),
            }
        }
    }

    #[test]
    fn final_keeps_everything_after_label() {
        let raw = "Final Response: line one\nAction: not really\nline three";
        match parse_response(raw).unwrap() {
            ParsedResponse::Final { output, .. } => {
                assert_eq!(output, "line one\nAction: not really\nline three")
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn final_wins_over_action() {
        let raw = "Thought: hmm\nAction: read_file\nAction Input: a.txt\nFinal Answer: never mind";
        assert!(matches!(
            parse_response(raw).unwrap(),
            ParsedResponse::Final { ref output, .. } if output == "never mind"
        ));
    }

    #[test]
    fn simple_action() {
        let raw = "Thought: I should look\nAction: read_file\nAction Input: missing.txt";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.thought(), "I should look");
        assert_eq!(as_action(parsed), pair("read_file", "missing.txt"));
    }

    #[test]
    fn backticks_stripped_from_tool() {
        let raw = "Action: `list_files`\nAction Input: .";
        assert_eq!(as_action(parse_response(raw).unwrap()), pair("list_files", "."));
    }

    #[test]
    fn multiline_input() {
        let raw = "Action: write_file\nAction Input: path: a.txt\ncontent: one\ntwo\n";
        assert_eq!(
            as_action(parse_response(raw).unwrap()),
            pair("write_file", "path: a.txt\ncontent: one\ntwo")
        );
    }

    #[test]
    fn input_stops_at_hallucinated_observation() {
        let raw = "Action: read_file\nAction Input: a.txt\nObservation: contents I made up\nThought: more";
        assert_eq!(as_action(parse_response(raw).unwrap()), pair("read_file", "a.txt"));
    }

    #[test]
    fn labels_mid_line_ignored() {
        let raw = "Thought: the Action: label below is the real one\nAction: list_files\nAction Input: src";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.thought(), "the Action: label below is the real one");
        assert_eq!(as_action(parsed), pair("list_files", "src"));
    }

    #[test]
    fn missing_thought_is_empty() {
        let parsed = parse_response("Action: list_files\nAction Input: .").unwrap();
        assert_eq!(parsed.thought(), "");
    }

    #[test]
    fn input_before_action_does_not_count() {
        let raw = "Action Input: a.txt\nAction: read_file";
        assert!(matches!(
            parse_response(raw),
            Err(AgentError::UnparsableResponse { .. })
        ));
    }

    #[test]
    fn action_without_input_is_unparsable() {
        let err = parse_response("Thought: hmm\nAction: read_file").unwrap_err();
        match err {
            AgentError::UnparsableResponse { raw } => assert!(raw.contains("read_file")),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn empty_tool_name_is_unparsable() {
        assert!(parse_response("Action:\nAction Input: x").is_err());
    }

    #[test]
    fn prose_is_unparsable() {
        assert!(parse_response("I think the answer is 4.").is_err());
        assert!(parse_response("").is_err());
    }

    #[test]
    fn prefix_words_are_not_labels() {
        assert!(parse_response("Finally: done\nActionable: x\nAction Inputs: y").is_err());
    }

    #[test]
    fn crlf_line_endings() {
        let raw = "Thought: ok\r\nAction: list_files\r\nAction Input: src\r\n";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.thought(), "ok");
        assert_eq!(as_action(parsed), pair("list_files", "src"));
    }
}
