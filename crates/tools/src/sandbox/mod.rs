//! Script sandbox: run WebAssembly text or binary modules under wasmtime.
//!
//! Every run gets a fresh `Store` and `Linker`, so nothing a script does
//! survives into the next one. Execution is bounded three ways:
//!
//! - **fuel** caps the number of instructions,
//! - a **store limiter** caps linear memory and instance counts,
//! - a **wall-clock timeout** plus the run's cancellation token drop the
//!   future; fuel yields periodically, so even a tight loop notices.
//!
//! The only host capabilities are the imports in [`host`]. Any other import
//! module name is a file path resolved against the working root.

mod format;
mod host;
mod modules;

pub use format::{ScriptValue, format_value};

use std::time::Duration;
use tether_config::SandboxConfig;
use tether_core::{ExecutionContext, ToolError};
use tether_security::ConfinementError;
use tracing::{debug, info, warn};
use wasmtime::{Config, Engine, Linker, Store, StoreLimitsBuilder, Trap, Val};

use host::{HostState, SandboxTrap};

/// Fuel is consumed in slices of this size between async yields.
const FUEL_YIELD_INTERVAL: u64 = 10_000;
const MAX_INSTANCES: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Script failed to compile: {0}")]
    Compile(String),

    #[error("Failed to load module '{specifier}': {reason}")]
    ModuleLoad { specifier: String, reason: String },

    #[error(transparent)]
    Access(#[from] ConfinementError),

    #[error("Sandbox violation: {0}")]
    Violation(String),

    #[error("Script exceeded its instruction budget ({fuel} fuel)")]
    FuelExhausted { fuel: u64 },

    #[error("Script timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Script error: {0}")]
    Script(String),

    #[error("Script cancelled")]
    Cancelled,

    #[error("Sandbox setup failed: {0}")]
    Setup(String),
}

impl From<SandboxError> for ToolError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::Access(e) => e.into(),
            SandboxError::Violation(msg) => ToolError::SandboxViolation(msg),
            SandboxError::Cancelled => ToolError::Cancelled,
            other => ToolError::ExecutionFailed {
                tool_name: "run_script".into(),
                reason: other.to_string(),
            },
        }
    }
}

/// What a script produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutput {
    pub value: ScriptValue,
    /// Console lines joined with `\n`, truncated past the configured ceiling.
    pub logs: String,
}

impl ScriptOutput {
    /// Logged text, or the formatted value when nothing was logged.
    pub fn display(&self) -> String {
        if self.logs.is_empty() {
            format_value(&self.value)
        } else {
            self.logs.clone()
        }
    }
}

/// The script engine. Cheap to share; each run builds its own store.
pub struct Sandbox {
    engine: Engine,
    config: SandboxConfig,
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Result<Self, SandboxError> {
        let mut engine_config = Config::new();
        engine_config.async_support(true);
        engine_config.consume_fuel(true);

        let engine = Engine::new(&engine_config)
            .map_err(|e| SandboxError::Setup(format!("failed to create wasm engine: {e}")))?;

        info!(
            fuel = config.fuel,
            timeout_ms = config.timeout_ms,
            max_memory = config.max_memory_bytes,
            "Script sandbox ready"
        );
        Ok(Self { engine, config })
    }

    /// Run `source` (WAT text or a wasm binary) to completion.
    pub async fn run(
        &self,
        source: &[u8],
        ctx: &ExecutionContext,
    ) -> Result<ScriptOutput, SandboxError> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => {
                debug!("Script cancelled");
                Err(SandboxError::Cancelled)
            }
            result = tokio::time::timeout(timeout, self.execute(source, ctx)) => match result {
                Ok(output) => output,
                Err(_) => {
                    warn!(timeout_ms = self.config.timeout_ms, "Script timed out");
                    Err(SandboxError::Timeout { ms: self.config.timeout_ms })
                }
            },
        }
    }

    /// Run and render for a human or a model: logs if any, else the value.
    pub async fn run_for_output(
        &self,
        source: &[u8],
        ctx: &ExecutionContext,
    ) -> Result<String, SandboxError> {
        Ok(self.run(source, ctx).await?.display())
    }

    async fn execute(
        &self,
        source: &[u8],
        ctx: &ExecutionContext,
    ) -> Result<ScriptOutput, SandboxError> {
        let entry = modules::compile(&self.engine, source, "script")?;
        modules::check_host_imports(&entry, "script")?;
        let dependencies = modules::load_dependencies(&self.engine, &entry, ctx.root())?;

        let limits = StoreLimitsBuilder::new()
            .memory_size(self.config.max_memory_bytes)
            .instances(MAX_INSTANCES)
            .memories(MAX_INSTANCES)
            .tables(MAX_INSTANCES)
            .build();
        let state = HostState::new(
            limits,
            ctx.merged_env(),
            ctx.root().display().to_string(),
            self.config.max_log_chars,
        );

        let mut store = Store::new(&self.engine, state);
        store.limiter(|s| &mut s.limits);
        store
            .set_fuel(self.config.fuel)
            .map_err(|e| SandboxError::Setup(format!("failed to set fuel: {e}")))?;
        store
            .fuel_async_yield_interval(Some(FUEL_YIELD_INTERVAL))
            .map_err(|e| SandboxError::Setup(format!("failed to set yield interval: {e}")))?;

        let mut linker: Linker<HostState> = Linker::new(&self.engine);
        host::add_to_linker(&mut linker)
            .map_err(|e| SandboxError::Setup(format!("failed to link host imports: {e}")))?;

        for dep in &dependencies {
            let instance = linker
                .instantiate_async(&mut store, &dep.module)
                .await
                .map_err(|e| self.classify(e))?;
            for specifier in &dep.specifiers {
                linker
                    .instance(&mut store, specifier, instance)
                    .map_err(|e| SandboxError::Setup(format!("failed to register '{specifier}': {e}")))?;
            }
        }

        // The start function, if any, runs here.
        let instance = linker
            .instantiate_async(&mut store, &entry)
            .await
            .map_err(|e| self.classify(e))?;

        let mut value = ScriptValue::Undefined;
        if let Some(main) = instance.get_func(&mut store, "main") {
            let ty = main.ty(&store);
            if ty.params().len() != 0 {
                return Err(SandboxError::Script(
                    "exported 'main' must take no parameters".into(),
                ));
            }
            let mut results = vec![Val::I32(0); ty.results().len()];
            main.call_async(&mut store, &[], &mut results)
                .await
                .map_err(|e| self.classify(e))?;
            value = results_to_value(&results);
        }

        let used = self.config.fuel - store.get_fuel().unwrap_or(0);
        debug!(fuel_used = used, "Script finished");

        let state = store.data_mut();
        Ok(ScriptOutput {
            value: state.result.take().unwrap_or(value),
            logs: state.take_logs(),
        })
    }

    /// Map a wasmtime error back onto the sandbox taxonomy.
    fn classify(&self, err: wasmtime::Error) -> SandboxError {
        if let Some(trap) = err.downcast_ref::<SandboxTrap>() {
            return match trap {
                SandboxTrap::Violation(msg) => SandboxError::Violation(msg.clone()),
                SandboxTrap::Script(msg) => SandboxError::Script(msg.clone()),
            };
        }
        if err.downcast_ref::<Trap>() == Some(&Trap::OutOfFuel) {
            return SandboxError::FuelExhausted {
                fuel: self.config.fuel,
            };
        }
        SandboxError::Script(err.root_cause().to_string())
    }
}

fn results_to_value(results: &[Val]) -> ScriptValue {
    let mut values: Vec<ScriptValue> = results.iter().map(val_to_value).collect();
    match values.len() {
        0 => ScriptValue::Undefined,
        1 => values.remove(0),
        _ => ScriptValue::List(values),
    }
}

fn val_to_value(val: &Val) -> ScriptValue {
    match val {
        Val::I32(v) => ScriptValue::I32(*v),
        Val::I64(v) => ScriptValue::I64(*v),
        Val::F32(bits) => ScriptValue::F32(f32::from_bits(*bits)),
        Val::F64(bits) => ScriptValue::F64(f64::from_bits(*bits)),
        Val::V128(_) => ScriptValue::Opaque("v128"),
        _ => ScriptValue::Opaque("reference"),
    }
}
