//! URL fetch tool: HTTP(S) GET through a spawned `curl`.
//!
//! The child is spawned with `kill_on_drop`, so cancelling the run (which
//! drops the wait future) kills the transfer too.

use async_trait::async_trait;
use std::process::Stdio;
use tether_config::FetchConfig;
use tether_core::{ExecutionContext, Tool, ToolError};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::text::truncate_chars;

pub struct FetchUrlTool {
    config: FetchConfig,
}

impl FetchUrlTool {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    fn failed(reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: "fetch_url".into(),
            reason: reason.into(),
        }
    }
}

/// Accept only absolute http(s) URLs with a host and no whitespace.
fn validate_url(input: &str) -> Result<&str, ToolError> {
    let url = input.trim();
    if url.is_empty() {
        return Err(ToolError::Validation("missing URL".into()));
    }
    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .ok_or_else(|| {
            ToolError::Validation(format!("only http:// and https:// URLs are allowed: {url}"))
        })?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(ToolError::Validation(format!("malformed URL: {url}")));
    }
    Ok(url)
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> &str {
        "Fetch a web page or API response over HTTP(S) and return the body as text."
    }

    fn usage(&self) -> Option<&str> {
        Some("Action Input: an absolute http:// or https:// URL")
    }

    async fn execute(&self, input: &str, ctx: &ExecutionContext) -> Result<String, ToolError> {
        let url = validate_url(input)?;
        if ctx.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        debug!(url, "Fetching URL");
        let child = Command::new(&self.config.curl_path)
            .args(["--silent", "--show-error", "--location", "--proto", "=http,https"])
            .args(["--max-time", &self.config.timeout_secs.to_string()])
            .args(["--max-filesize", &self.config.max_bytes.to_string()])
            .arg("--")
            .arg(url)
            .current_dir(ctx.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Self::failed(format!("'{}' is not installed or not on PATH", self.config.curl_path))
                } else {
                    Self::failed(format!("failed to start curl: {e}"))
                }
            })?;

        let output = tokio::select! {
            _ = ctx.cancellation().cancelled() => return Err(ToolError::Cancelled),
            out = child.wait_with_output() => out.map_err(|e| Self::failed(e.to_string()))?,
        };

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url, exit_code = code, "Fetch failed");
            return Err(Self::failed(format!("curl exited with {code}: {}", stderr.trim())));
        }

        let body = String::from_utf8_lossy(&output.stdout);
        if body.trim().is_empty() {
            return Ok("(empty response body)".into());
        }
        Ok(truncate_chars(&body, self.config.max_chars))
    }
}
