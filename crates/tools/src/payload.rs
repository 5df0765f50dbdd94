//! Structured action inputs.
//!
//! Tools that take more than one argument accept either a JSON object of
//! strings or a `key: value` block, one field per line, where the trailing
//! field (e.g. `content`) swallows every remaining line verbatim:
//!
//! ```text
//! path: notes/todo.md
//! content:
//! - first item
//! - second item
//! ```

use std::collections::BTreeMap;
use tether_core::ToolError;

/// The fields a tool accepts.
#[derive(Debug, Clone, Copy)]
pub struct PayloadShape {
    pub fields: &'static [&'static str],
    /// Field that consumes the rest of a line-delimited payload.
    pub trailing: Option<&'static str>,
}

#[derive(Debug, Default)]
pub struct Payload {
    fields: BTreeMap<String, String>,
}

impl Payload {
    pub fn parse(input: &str, shape: &PayloadShape) -> Result<Self, ToolError> {
        let trimmed = input.trim();
        if trimmed.starts_with('{') {
            Self::parse_json(trimmed, shape)
        } else {
            Self::parse_lines(input, shape)
        }
    }

    fn parse_json(input: &str, shape: &PayloadShape) -> Result<Self, ToolError> {
        let value: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| ToolError::Validation(format!("malformed JSON input: {e}")))?;
        let serde_json::Value::Object(map) = value else {
            return Err(ToolError::Validation("JSON input must be an object".into()));
        };

        let mut fields = BTreeMap::new();
        for (key, value) in map {
            if !shape.fields.contains(&key.as_str()) {
                return Err(unknown_field(&key, shape));
            }
            match value {
                serde_json::Value::String(s) => {
                    fields.insert(key, s);
                }
                serde_json::Value::Null => {}
                other => {
                    return Err(ToolError::Validation(format!(
                        "field '{key}' must be a string, got {other}"
                    )));
                }
            }
        }
        Ok(Self { fields })
    }

    fn parse_lines(input: &str, shape: &PayloadShape) -> Result<Self, ToolError> {
        let mut fields = BTreeMap::new();
        let body = input.trim_start_matches(['\r', '\n']);
        let mut consumed = 0;

        for raw in body.split_inclusive('\n') {
            consumed += raw.len();
            let line = raw.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = split_key(line) else {
                return Err(ToolError::Validation(format!(
                    "expected a 'key: value' line, got '{}'",
                    line.trim()
                )));
            };
            if !shape.fields.contains(&key.as_str()) {
                return Err(unknown_field(&key, shape));
            }

            // Everything after the trailing field's line is kept byte for byte.
            if shape.trailing == Some(key.as_str()) {
                let rest = &body[consumed..];
                let mut content = value.to_string();
                if !rest.is_empty() && !content.is_empty() {
                    content.push_str(&raw[line.len()..]);
                }
                content.push_str(rest);
                fields.insert(key, content);
                break;
            }
            fields.insert(key, value.trim().to_string());
        }
        Ok(Self { fields })
    }

    /// A field that must be present (may be empty only if the tool allows it).
    pub fn required(&self, name: &str) -> Result<&str, ToolError> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ToolError::Validation(format!("missing required field '{name}'")))
    }

    pub fn optional(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// `key: value` with an identifier-like key. Returns the lowercased key and
/// the value with one leading space removed.
fn split_key(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let value = value.strip_prefix(' ').unwrap_or(value);
    Some((key.to_ascii_lowercase(), value))
}

fn unknown_field(key: &str, shape: &PayloadShape) -> ToolError {
    ToolError::Validation(format!(
        "unknown field '{key}' (expected: {})",
        shape.fields.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITE: PayloadShape = PayloadShape {
        fields: &["path", "content"],
        trailing: Some("content"),
    };

    #[test]
    fn json_object() {
        let p = Payload::parse(r#"{"path": "a.txt", "content": "x\ny"}"#, &WRITE).unwrap();
        assert_eq!(p.required("path").unwrap(), "a.txt");
        assert_eq!(p.required("content").unwrap(), "x\ny");
    }

    #[test]
    fn json_non_string_rejected() {
        let err = Payload::parse(r#"{"path": 3}"#, &WRITE).unwrap_err();
        assert!(err.to_string().contains("'path'"));
    }

    #[test]
    fn trailing_field_consumes_rest() {
        let input = "path: notes.md\ncontent:\n# Title\n\nkey: value stays content\n";
        let p = Payload::parse(input, &WRITE).unwrap();
        assert_eq!(p.required("path").unwrap(), "notes.md");
        assert_eq!(
            p.required("content").unwrap(),
            "# Title\n\nkey: value stays content\n"
        );
    }

    #[test]
    fn trailing_field_keeps_crlf_bytes() {
        let p = Payload::parse("path: w.txt\ncontent:\na\r\nb\r\n", &WRITE).unwrap();
        assert_eq!(p.required("path").unwrap(), "w.txt");
        assert_eq!(p.required("content").unwrap(), "a\r\nb\r\n");

        let p = Payload::parse("path: w.txt\r\ncontent: a\r\nb", &WRITE).unwrap();
        assert_eq!(p.required("path").unwrap(), "w.txt");
        assert_eq!(p.required("content").unwrap(), "a\r\nb");
    }

    #[test]
    fn trailing_field_inline_value() {
        let p = Payload::parse("path: a.txt\ncontent: hello", &WRITE).unwrap();
        assert_eq!(p.required("content").unwrap(), "hello");
    }

    #[test]
    fn unknown_and_missing_fields_named() {
        let err = Payload::parse("file: a.txt", &WRITE).unwrap_err();
        assert!(err.to_string().contains("unknown field 'file'"));

        let p = Payload::parse("path: a.txt", &WRITE).unwrap();
        let err = p.required("content").unwrap_err();
        assert!(err.to_string().contains("'content'"));
    }

    #[test]
    fn garbage_line_rejected() {
        assert!(Payload::parse("just some text", &WRITE).is_err());
    }
}
