//! File read tool: read file contents under the project root.

use async_trait::async_trait;
use tether_core::{ExecutionContext, Tool, ToolError};
use tether_security::{confine, display_path};

use crate::text::truncate_chars;

pub struct ReadFileTool {
    /// Files larger than this are refused.
    max_bytes: u64,
    /// Output is truncated past this many characters.
    max_chars: usize,
}

impl ReadFileTool {
    pub fn new(max_bytes: u64, max_chars: usize) -> Self {
        Self {
            max_bytes,
            max_chars,
        }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file inside the project."
    }

    fn usage(&self) -> Option<&str> {
        Some("Action Input: a file path relative to the project root")
    }

    async fn execute(&self, input: &str, ctx: &ExecutionContext) -> Result<String, ToolError> {
        let requested = input.trim();
        if requested.is_empty() {
            return Err(ToolError::Validation("missing file path".into()));
        }

        let path = confine(requested, ctx.root())?;
        let shown = display_path(&path, ctx.root());

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ToolError::io(shown.clone(), e))?;
        if meta.is_dir() {
            return Err(ToolError::IsDirectory(shown));
        }
        if meta.len() > self.max_bytes {
            return Ok(format!(
                "File too large to read: {shown} is {} bytes (limit {} bytes)",
                meta.len(),
                self.max_bytes
            ));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::io(shown, e))?;
        Ok(truncate_chars(&String::from_utf8_lossy(&bytes), self.max_chars))
    }
}
