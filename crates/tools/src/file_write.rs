//! File write tool: create or overwrite files under the project root.

use async_trait::async_trait;
use tether_core::{ExecutionContext, Tool, ToolError};
use tether_security::{confine, display_path};

use crate::payload::{Payload, PayloadShape};

const SHAPE: PayloadShape = PayloadShape {
    fields: &["path", "content"],
    trailing: Some("content"),
};

#[derive(Debug, Default)]
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write UTF-8 text to a file inside the project. Creates parent directories and overwrites existing files."
    }

    fn usage(&self) -> Option<&str> {
        Some(
            "Action Input: {\"path\": \"...\", \"content\": \"...\"} or\n\
             path: <file path>\n\
             content:\n\
             <file contents, all remaining lines>",
        )
    }

    async fn execute(&self, input: &str, ctx: &ExecutionContext) -> Result<String, ToolError> {
        let payload = Payload::parse(input, &SHAPE)?;
        let requested = payload.required("path")?.trim();
        if requested.is_empty() {
            return Err(ToolError::Validation("field 'path' must not be empty".into()));
        }
        let content = payload.required("content")?;

        let path = confine(requested, ctx.root())?;
        let shown = display_path(&path, ctx.root());

        if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
            return Err(ToolError::IsDirectory(shown));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io(shown.clone(), e))?;
        }
        tokio::fs::write(&path, content.as_bytes())
            .await
            .map_err(|e| ToolError::io(shown.clone(), e))?;

        tracing::debug!(path = %shown, bytes = content.len(), "Wrote file");
        Ok(format!("Wrote {} bytes to {shown}", content.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_read::ReadFileTool;

    fn setup() -> (tempfile::TempDir, ExecutionContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::new(dir.path()).unwrap();
        (dir, ctx)
    }

    #[tokio::test]
    async fn write_creates_parents() {
        let (dir, ctx) = setup();
        let out = WriteFileTool
            .execute(r#"{"path": "a/b/c.txt", "content": "hi"}"#, &ctx)
            .await
            .unwrap();
        assert_eq!(out, "Wrote 2 bytes to a/b/c.txt");
        assert_eq!(std::fs::read_to_string(dir.path().join("a/b/c.txt")).unwrap(), "hi");
    }

    #[tokio::test]
    async fn write_then_read_is_identical() {
        let (_dir, ctx) = setup();
        let content = "line one\n\tindented — ünïcode\r\nlast line without newline";
        let input = serde_json::json!({"path": "notes.txt", "content": content}).to_string();
        WriteFileTool.execute(&input, &ctx).await.unwrap();

        let read = ReadFileTool::new(1 << 20, 1 << 20)
            .execute("notes.txt", &ctx)
            .await
            .unwrap();
        assert_eq!(read, content);
    }

    #[tokio::test]
    async fn line_payload_accepted() {
        let (dir, ctx) = setup();
        let out = WriteFileTool
            .execute("path: todo.md\ncontent:\n- one\n- two", &ctx)
            .await
            .unwrap();
        assert!(out.ends_with("to todo.md"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("todo.md")).unwrap(),
            "- one\n- two"
        );
    }

    #[tokio::test]
    async fn line_payload_keeps_crlf_on_round_trip() {
        let (dir, ctx) = setup();
        let out = WriteFileTool
            .execute("path: w.txt\ncontent:\na\r\nb\r\n", &ctx)
            .await
            .unwrap();
        assert_eq!(out, "Wrote 6 bytes to w.txt");
        assert_eq!(std::fs::read(dir.path().join("w.txt")).unwrap(), b"a\r\nb\r\n");

        let read = ReadFileTool::new(1 << 20, 1 << 20)
            .execute("w.txt", &ctx)
            .await
            .unwrap();
        assert_eq!(read, "a\r\nb\r\n");
    }

    #[tokio::test]
    async fn escape_blocked() {
        let (_dir, ctx) = setup();
        let err = WriteFileTool
            .execute(r#"{"path": "../evil.txt", "content": "x"}"#, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::AccessViolation { .. }));
    }

    #[tokio::test]
    async fn missing_content_named() {
        let (_dir, ctx) = setup();
        let err = WriteFileTool.execute("path: a.txt", &ctx).await.unwrap_err();
        assert!(err.to_string().contains("'content'"));
    }
}
