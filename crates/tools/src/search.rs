//! Recursive regex search over the project tree.
//!
//! The walk is an explicit depth-first stack over sorted directory entries.
//! Symlinks are never followed, and VCS or build-output directories are
//! skipped. Every line is matched on its own, so a compiled pattern carries
//! no state between lines or files.

use async_trait::async_trait;
use regex_lite::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};
use tether_config::SearchConfig;
use tether_core::{ExecutionContext, Tool, ToolError};
use tether_security::{confine, display_path};
use tracing::debug;

use crate::payload::{Payload, PayloadShape};
use crate::text::truncate_chars;

pub const NO_MATCHES: &str = "No matches found.";

const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    ".next",
    ".cache",
];

/// One search request.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub pattern: String,
    /// Sub-directory (or single file) to search, relative to the root.
    pub path: Option<String>,
    /// JS-style flag letters, e.g. `"i"` or `"im"`.
    pub flags: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchEngine {
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub async fn search(
        &self,
        request: &SearchRequest,
        ctx: &ExecutionContext,
    ) -> Result<String, ToolError> {
        let regex = compile(&request.pattern, request.flags.as_deref())?;
        let start = confine(request.path.as_deref().unwrap_or("."), ctx.root())?;

        let mut matches: Vec<String> = Vec::new();
        let mut capped = false;
        let mut stack = vec![start];

        while let Some(path) = stack.pop() {
            if ctx.is_cancelled() {
                return Err(ToolError::Cancelled);
            }
            let shown = display_path(&path, ctx.root());
            let meta = match tokio::fs::symlink_metadata(&path).await {
                Ok(m) => m,
                Err(e) => {
                    matches.push(format!("error reading {shown}: {e}"));
                    continue;
                }
            };

            if meta.is_dir() {
                match sorted_children(&path).await {
                    Ok(children) => stack.extend(children.into_iter().rev()),
                    Err(e) => matches.push(format!("error reading {shown}: {e}")),
                }
            } else if meta.is_file() {
                if meta.len() > self.config.max_file_bytes {
                    debug!(path = %shown, size = meta.len(), "Skipping large file");
                    continue;
                }
                match tokio::fs::read(&path).await {
                    Ok(bytes) => {
                        let room = self.config.max_matches - matches.len();
                        let found = scan(&regex, &shown, &bytes, room);
                        matches.extend(found);
                    }
                    Err(e) => matches.push(format!("error reading {shown}: {e}")),
                }
            }

            if matches.len() >= self.config.max_matches {
                matches.truncate(self.config.max_matches);
                capped = true;
                break;
            }
        }

        if matches.is_empty() {
            return Ok(NO_MATCHES.to_string());
        }
        let mut out = matches.join("\n");
        if capped {
            out.push_str(&format!(
                "\n... [stopped after {} matches]",
                self.config.max_matches
            ));
        }
        Ok(truncate_chars(&out, self.config.max_output_chars))
    }
}

/// Build the regex, mapping JS-style flag letters onto builder options.
pub fn compile(pattern: &str, flags: Option<&str>) -> Result<Regex, ToolError> {
    if pattern.is_empty() {
        return Err(ToolError::Validation("field 'pattern' must not be empty".into()));
    }
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.unwrap_or_default().chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'U' => builder.swap_greed(true),
            // Meaningless for line-at-a-time matching.
            'g' | 'u' | 'y' => &mut builder,
            other => {
                return Err(ToolError::Validation(format!(
                    "unsupported regex flag '{other}' (supported: i, m, s, x, U)"
                )));
            }
        };
    }
    builder
        .build()
        .map_err(|e| ToolError::Validation(format!("invalid regex pattern: {e}")))
}

async fn sorted_children(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut children = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_symlink() {
            continue;
        }
        let name = entry.file_name();
        if file_type.is_dir() && name.to_str().is_some_and(|n| IGNORED_DIRS.contains(&n)) {
            continue;
        }
        children.push(entry.path());
    }
    children.sort();
    Ok(children)
}

/// Match each line of `bytes`, returning at most `limit` hits.
fn scan(regex: &Regex, shown: &str, bytes: &[u8], limit: usize) -> Vec<String> {
    // NUL in the first block means binary; not worth matching.
    if bytes.iter().take(8192).any(|&b| b == 0) {
        return Vec::new();
    }
    let text = String::from_utf8_lossy(bytes);
    text.split('\n')
        .enumerate()
        .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| regex.is_match(line))
        .take(limit)
        .map(|(n, line)| format!("{shown}:{n}: {line}"))
        .collect()
}

const SHAPE: PayloadShape = PayloadShape {
    fields: &["pattern", "path", "flags"],
    trailing: None,
};

/// Tool wrapper around [`SearchEngine`].
pub struct SearchFilesTool {
    engine: SearchEngine,
}

impl SearchFilesTool {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            engine: SearchEngine::new(config),
        }
    }

    /// Structured payload, or the whole input as a bare pattern.
    fn parse_request(input: &str) -> Result<SearchRequest, ToolError> {
        let trimmed = input.trim();
        let structured = trimmed.starts_with('{')
            || trimmed
                .lines()
                .any(|l| l.trim_start().to_ascii_lowercase().starts_with("pattern:"));
        if !structured {
            return Ok(SearchRequest {
                pattern: trimmed.to_string(),
                ..SearchRequest::default()
            });
        }

        let payload = Payload::parse(trimmed, &SHAPE)?;
        Ok(SearchRequest {
            pattern: payload.required("pattern")?.to_string(),
            path: payload.optional("path").map(str::to_string),
            flags: payload.optional("flags").map(str::to_string),
        })
    }
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search file contents in the project with a regular expression. Returns path:line: text matches."
    }

    fn usage(&self) -> Option<&str> {
        Some(
            "Action Input: a bare regex, or {\"pattern\": \"...\", \"path\": \"src\", \"flags\": \"i\"}\n\
             (also accepted as 'pattern: ...' / 'path: ...' / 'flags: ...' lines)",
        )
    }

    async fn execute(&self, input: &str, ctx: &ExecutionContext) -> Result<String, ToolError> {
        let request = Self::parse_request(input)?;
        self.engine.search(&request, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, ExecutionContext) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/util")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() {\n    helper();\n}\n").unwrap();
        std::fs::write(
            root.join("src/util/helper.rs"),
            "pub fn helper() {}\r\n// TODO: Helper docs\r\n",
        )
        .unwrap();
        std::fs::write(root.join("node_modules/dep/index.js"), "helper()").unwrap();
        std::fs::write(root.join(".git/config"), "helper").unwrap();
        std::fs::write(root.join("README.md"), "Call helper() first.\n").unwrap();
        let ctx = ExecutionContext::new(root).unwrap();
        (dir, ctx)
    }

    fn engine() -> SearchEngine {
        SearchEngine::new(SearchConfig::default())
    }

    fn req(pattern: &str) -> SearchRequest {
        SearchRequest {
            pattern: pattern.into(),
            ..SearchRequest::default()
        }
    }

    #[tokio::test]
    async fn finds_matches_in_sorted_order_and_skips_ignored() {
        let (_dir, ctx) = setup();
        let out = engine().search(&req("helper"), &ctx).await.unwrap();
        assert_eq!(
            out,
            "README.md:1: Call helper() first.\n\
             src/main.rs:2:     helper();\n\
             src/util/helper.rs:1: pub fn helper() {}"
        );
    }

    #[tokio::test]
    async fn no_match_is_exact_message() {
        let (_dir, ctx) = setup();
        let out = engine().search(&req("zzz_not_here"), &ctx).await.unwrap();
        assert_eq!(out, "No matches found.");
    }

    #[tokio::test]
    async fn case_insensitive_flag_and_sub_path() {
        let (_dir, ctx) = setup();
        let request = SearchRequest {
            pattern: "todo: helper".into(),
            path: Some("src".into()),
            flags: Some("gi".into()),
        };
        let out = engine().search(&request, &ctx).await.unwrap();
        assert_eq!(out, "src/util/helper.rs:2: // TODO: Helper docs");
    }

    #[tokio::test]
    async fn bad_flag_and_bad_regex_rejected() {
        let (_dir, ctx) = setup();
        let request = SearchRequest {
            pattern: "x".into(),
            flags: Some("q".into()),
            ..SearchRequest::default()
        };
        let err = engine().search(&request, &ctx).await.unwrap_err();
        assert!(err.to_string().contains("unsupported regex flag 'q'"));

        let err = engine().search(&req("(unclosed"), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn escape_rejected() {
        let (_dir, ctx) = setup();
        let request = SearchRequest {
            pattern: "x".into(),
            path: Some("../".into()),
            ..SearchRequest::default()
        };
        let err = engine().search(&request, &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::AccessViolation { .. }));
    }

    #[tokio::test]
    async fn stops_at_match_cap() {
        let (dir, ctx) = setup();
        std::fs::write(dir.path().join("many.txt"), "hit\n".repeat(50)).unwrap();
        let engine = SearchEngine::new(SearchConfig {
            max_matches: 5,
            ..SearchConfig::default()
        });
        let out = engine.search(&req("^hit$"), &ctx).await.unwrap();
        assert_eq!(out.lines().filter(|l| l.starts_with("many.txt:")).count(), 5);
        assert!(out.ends_with("[stopped after 5 matches]"));
    }

    #[tokio::test]
    async fn large_files_skipped() {
        let (dir, ctx) = setup();
        std::fs::write(dir.path().join("huge.log"), "needle\n".repeat(100)).unwrap();
        let engine = SearchEngine::new(SearchConfig {
            max_file_bytes: 64,
            ..SearchConfig::default()
        });
        let out = engine.search(&req("needle"), &ctx).await.unwrap();
        assert_eq!(out, NO_MATCHES);
    }

    #[tokio::test]
    async fn cancellation_checked_between_files() {
        let (_dir, ctx) = setup();
        ctx.cancellation().cancel();
        let err = engine().search(&req("helper"), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::Cancelled));
    }

    #[tokio::test]
    async fn tool_accepts_bare_and_structured_input() {
        let (_dir, ctx) = setup();
        let tool = SearchFilesTool::new(SearchConfig::default());

        let bare = tool.execute("fn main", &ctx).await.unwrap();
        assert_eq!(bare, "src/main.rs:1: fn main() {");

        let structured = tool
            .execute("pattern: HELPER\npath: src/util\nflags: i", &ctx)
            .await
            .unwrap();
        assert_eq!(structured.lines().count(), 2);

        let json = tool
            .execute(r#"{"pattern": "first", "path": "README.md"}"#, &ctx)
            .await
            .unwrap();
        assert_eq!(json, "README.md:1: Call helper() first.");
    }
}
