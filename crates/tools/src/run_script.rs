//! Script tool: hand script text to the sandbox.

use async_trait::async_trait;
use std::sync::Arc;
use tether_core::{ExecutionContext, Tool, ToolError};

use crate::sandbox::Sandbox;
use crate::text::strip_code_fences;

pub struct RunScriptTool {
    sandbox: Arc<Sandbox>,
}

impl RunScriptTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for RunScriptTool {
    fn name(&self) -> &str {
        "run_script"
    }

    fn description(&self) -> &str {
        "Run a WebAssembly text (WAT) module in an isolated sandbox and return its console output or result."
    }

    fn usage(&self) -> Option<&str> {
        Some(
            "Action Input: a WAT module. Export `memory` and a no-argument `main`.\n\
             Imports: console.log/info/warn/error(ptr,len), console.log_i32/log_i64/log_f64(v),\n\
             process.env(kptr,klen,buf,cap)->i32, process.cwd(buf,cap)->i32,\n\
             timers.now()->i64, timers.sleep(ms i64), result.string/json(ptr,len).\n\
             Other import module names are .wat/.wasm files relative to the project root.",
        )
    }

    async fn execute(&self, input: &str, ctx: &ExecutionContext) -> Result<String, ToolError> {
        let script = strip_code_fences(input);
        if script.is_empty() {
            return Err(ToolError::Validation("script is empty".into()));
        }
        tracing::debug!(bytes = script.len(), "Running script");
        Ok(self.sandbox.run_for_output(script.as_bytes(), ctx).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_config::SandboxConfig;

    fn setup() -> (tempfile::TempDir, ExecutionContext, RunScriptTool) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::new(dir.path()).unwrap();
        let sandbox = Sandbox::new(SandboxConfig::default()).unwrap();
        (dir, ctx, RunScriptTool::new(Arc::new(sandbox)))
    }

    #[tokio::test]
    async fn fenced_script_runs() {
        let (_dir, ctx, tool) = setup();
        let input = "```wat\n(module (func (export \"main\") (result i64) (i64.const 9)))\n```";
        assert_eq!(tool.execute(input, &ctx).await.unwrap(), "9");
    }

    #[tokio::test]
    async fn exit_becomes_sandbox_violation() {
        let (_dir, ctx, tool) = setup();
        let input = r#"(module
            (import "process" "exit" (func $exit (param i32)))
            (func (export "main") (call $exit (i32.const 1))))"#;
        let err = tool.execute(input, &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation(_)));
        assert!(err.to_string().contains("not allowed inside the sandbox"));
    }

    #[tokio::test]
    async fn empty_script_rejected() {
        let (_dir, ctx, tool) = setup();
        assert!(matches!(
            tool.execute("```\n```", &ctx).await,
            Err(ToolError::Validation(_))
        ));
    }
}
