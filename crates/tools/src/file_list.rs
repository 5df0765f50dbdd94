//! Directory listing tool.

use async_trait::async_trait;
use tether_core::{ExecutionContext, Tool, ToolError};
use tether_security::{confine, display_path};

#[derive(Debug, Default)]
pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List the entries of a directory inside the project. Directories end with '/'."
    }

    fn usage(&self) -> Option<&str> {
        Some("Action Input: a directory path relative to the project root (empty for the root)")
    }

    async fn execute(&self, input: &str, ctx: &ExecutionContext) -> Result<String, ToolError> {
        let dir = confine(input.trim(), ctx.root())?;
        let shown = display_path(&dir, ctx.root());

        let meta = tokio::fs::metadata(&dir)
            .await
            .map_err(|e| ToolError::io(shown.clone(), e))?;
        if !meta.is_dir() {
            return Err(ToolError::Validation(format!("'{shown}' is not a directory")));
        }

        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ToolError::io(shown.clone(), e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| ToolError::io(shown.clone(), e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let line = match tokio::fs::metadata(entry.path()).await {
                Ok(m) if m.is_dir() => format!("{name}/"),
                Ok(_) => name.clone(),
                Err(e) => format!("{name} (error: {e})"),
            };
            entries.push((name, line));
        }

        if entries.is_empty() {
            return Ok("(empty directory)".into());
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries
            .into_iter()
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, ExecutionContext) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        let ctx = ExecutionContext::new(dir.path()).unwrap();
        (dir, ctx)
    }

    #[tokio::test]
    async fn lists_sorted_with_dir_suffix() {
        let (_dir, ctx) = setup();
        let out = ListFilesTool.execute("", &ctx).await.unwrap();
        assert_eq!(out, "a.txt\nb.txt\nsrc/");
    }

    #[tokio::test]
    async fn empty_directory() {
        let (_dir, ctx) = setup();
        let out = ListFilesTool.execute("src", &ctx).await.unwrap();
        assert_eq!(out, "(empty directory)");
    }

    #[tokio::test]
    async fn escape_rejected() {
        let (_dir, ctx) = setup();
        let err = ListFilesTool.execute("..", &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::AccessViolation { .. }));
    }

    #[tokio::test]
    async fn file_is_not_a_directory() {
        let (_dir, ctx) = setup();
        let err = ListFilesTool.execute("a.txt", &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn broken_entry_reported_inline() {
        let (dir, ctx) = setup();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("dangling"))
            .unwrap();
        let out = ListFilesTool.execute(".", &ctx).await.unwrap();
        assert!(out.contains("dangling (error:"));
    }
}
