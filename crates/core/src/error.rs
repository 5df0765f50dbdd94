//! Error types for the Tether domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.
//!
//! Propagation policy of the agent loop:
//! - [`AgentError`] ends a run immediately (unparsable reply, unknown tool,
//!   model client failure).
//! - [`ToolError`] is recovered: the loop turns it into an observation string
//!   so the model can correct itself on the next turn.
//! - [`ToolError::Cancelled`] ends the run as aborted, not as a failure.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures raised by a tool body. All of these are recoverable at the loop
/// level except [`ToolError::Cancelled`].
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Access denied: '{path}' resolves outside the project root {}", root.display())]
    AccessViolation { path: String, root: PathBuf },

    #[error("Sandbox violation: {0}")]
    SandboxViolation(String),

    #[error("Invalid tool input: {0}")]
    Validation(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Path is a directory, not a file: {0}")]
    IsDirectory(String),

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Tool execution cancelled")]
    Cancelled,
}

impl ToolError {
    /// Build an [`ToolError::Io`] for `path`, mapping `NotFound` to the
    /// dedicated [`ToolError::FileNotFound`] variant.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ToolError::FileNotFound(path)
        } else {
            ToolError::Io { path, source }
        }
    }
}

/// Hard failures that end an agent run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Could not parse model response: expected 'Final Response:' or 'Action:' + 'Action Input:'")]
    UnparsableResponse { raw: String },

    #[error("Unknown tool '{name}' (available: {})", available.join(", "))]
    UnknownTool { name: String, available: Vec<String> },

    #[error("Model call failed: {0}")]
    Provider(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = AgentError::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn access_violation_names_path_and_root() {
        let err = ToolError::AccessViolation {
            path: "../secrets".into(),
            root: PathBuf::from("/work/project"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Access denied"));
        assert!(msg.contains("../secrets"));
        assert!(msg.contains("/work/project"));
    }

    #[test]
    fn io_not_found_maps_to_file_not_found() {
        let err = ToolError::io(
            "missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ToolError::FileNotFound(ref p) if p == "missing.txt"));

        let err = ToolError::io(
            "locked.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, ToolError::Io { .. }));
    }

    #[test]
    fn unknown_tool_lists_available() {
        let err = AgentError::UnknownTool {
            name: "delete_everything".into(),
            available: vec!["read_file".into(), "list_files".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("delete_everything"));
        assert!(msg.contains("read_file, list_files"));
    }
}
