//! Host imports: the whole capability surface a script can see.
//!
//! | module    | import                                | effect                          |
//! |-----------|---------------------------------------|---------------------------------|
//! | `console` | `log` `info` `warn` `error` (ptr,len) | record a UTF-8 line             |
//! | `console` | `log_i32` `log_i64` `log_f64`         | record a number                 |
//! | `process` | `env` (kptr,klen,buf,cap) -> i32      | copy an env value, `-1` if unset|
//! | `process` | `cwd` (buf,cap) -> i32                | copy the working root           |
//! | `process` | `exit` (code)                         | always traps                    |
//! | `timers`  | `now` -> i64, `sleep` (ms)            | epoch millis / async sleep      |
//! | `result`  | `string` `json` (ptr,len)             | set the script's return value   |
//!
//! Strings are passed as (pointer, length) into the caller's exported
//! `memory`. Copy-out imports write at most `cap` bytes and return the full
//! length so a script can retry with a bigger buffer.

use std::collections::BTreeMap;
use std::time::Duration;
use wasmtime::{Caller, Extern, Linker, Memory, StoreLimits};

use super::format::ScriptValue;

pub(crate) const EXIT_NOT_ALLOWED: &str = "process.exit(..) is not allowed inside the sandbox";

/// Host namespaces and the names each one exports.
pub(crate) const HOST_IMPORTS: &[(&str, &[&str])] = &[
    (
        "console",
        &["log", "info", "warn", "error", "log_i32", "log_i64", "log_f64"],
    ),
    ("process", &["env", "cwd", "exit"]),
    ("timers", &["now", "sleep"]),
    ("result", &["string", "json"]),
];

pub(crate) fn is_host_namespace(module: &str) -> bool {
    HOST_IMPORTS.iter().any(|(ns, _)| *ns == module)
}

pub(crate) fn is_host_import(module: &str, name: &str) -> bool {
    HOST_IMPORTS
        .iter()
        .any(|(ns, names)| *ns == module && names.contains(&name))
}

/// Errors raised from inside host functions, recovered with `downcast_ref`
/// once the trap unwinds out of wasm.
#[derive(Debug, thiserror::Error)]
pub(crate) enum SandboxTrap {
    #[error("{0}")]
    Violation(String),

    #[error("{0}")]
    Script(String),
}

/// Per-run store data. A fresh one is built for every execution.
pub(crate) struct HostState {
    pub limits: StoreLimits,
    pub env: BTreeMap<String, String>,
    pub cwd: String,
    pub result: Option<ScriptValue>,
    logs: Vec<String>,
    log_chars: usize,
    max_log_chars: usize,
    logs_truncated: bool,
}

impl HostState {
    pub fn new(
        limits: StoreLimits,
        env: BTreeMap<String, String>,
        cwd: String,
        max_log_chars: usize,
    ) -> Self {
        Self {
            limits,
            env,
            cwd,
            result: None,
            logs: Vec::new(),
            log_chars: 0,
            max_log_chars,
            logs_truncated: false,
        }
    }

    /// Lines past the ceiling are dropped and flagged, so a runaway loop of
    /// `console.log` can't grow host memory without bound.
    fn record(&mut self, line: String) {
        if self.log_chars > self.max_log_chars {
            self.logs_truncated = true;
            return;
        }
        self.log_chars += line.chars().count() + 1;
        self.logs.push(line);
    }

    pub fn take_logs(&mut self) -> String {
        let joined = std::mem::take(&mut self.logs).join("\n");
        let mut text = crate::text::truncate_chars(&joined, self.max_log_chars);
        if self.logs_truncated && text.len() == joined.len() {
            text.push_str("\n... [further output dropped]");
        }
        text
    }
}

fn memory(caller: &mut Caller<'_, HostState>) -> wasmtime::Result<Memory> {
    match caller.get_export("memory") {
        Some(Extern::Memory(mem)) => Ok(mem),
        _ => Err(SandboxTrap::Script(
            "module must export its linear memory as \"memory\" to exchange strings with the host"
                .into(),
        )
        .into()),
    }
}

fn span(ptr: i32, len: i32) -> wasmtime::Result<(usize, usize)> {
    let start = usize::try_from(ptr)
        .map_err(|_| SandboxTrap::Script(format!("negative pointer {ptr}")))?;
    let len =
        usize::try_from(len).map_err(|_| SandboxTrap::Script(format!("negative length {len}")))?;
    let end = start
        .checked_add(len)
        .ok_or_else(|| SandboxTrap::Script("pointer overflow".into()))?;
    Ok((start, end))
}

fn read_string(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> wasmtime::Result<String> {
    let mem = memory(caller)?;
    let (start, end) = span(ptr, len)?;
    let bytes = mem.data(&*caller).get(start..end).ok_or_else(|| {
        SandboxTrap::Script(format!("string at {start}..{end} is out of bounds"))
    })?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Copy `value` into `buf[..cap]`, returning the full length.
fn write_out(
    caller: &mut Caller<'_, HostState>,
    buf: i32,
    cap: i32,
    value: &[u8],
) -> wasmtime::Result<i32> {
    let mem = memory(caller)?;
    let (start, end) = span(buf, cap)?;
    let n = value.len().min(end - start);
    let dest = mem
        .data_mut(&mut *caller)
        .get_mut(start..start + n)
        .ok_or_else(|| SandboxTrap::Script(format!("buffer at {start}..{end} is out of bounds")))?;
    dest.copy_from_slice(&value[..n]);
    i32::try_from(value.len()).map_err(|_| SandboxTrap::Script("value too large".into()).into())
}

/// Register every host import on `linker`.
pub(crate) fn add_to_linker(linker: &mut Linker<HostState>) -> wasmtime::Result<()> {
    for (name, prefix) in [("log", ""), ("info", ""), ("warn", "[warn] "), ("error", "[error] ")] {
        linker.func_wrap(
            "console",
            name,
            move |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<()> {
                let text = read_string(&mut caller, ptr, len)?;
                caller.data_mut().record(format!("{prefix}{text}"));
                Ok(())
            },
        )?;
    }
    linker.func_wrap("console", "log_i32", |mut caller: Caller<'_, HostState>, v: i32| {
        caller.data_mut().record(v.to_string());
    })?;
    linker.func_wrap("console", "log_i64", |mut caller: Caller<'_, HostState>, v: i64| {
        caller.data_mut().record(v.to_string());
    })?;
    linker.func_wrap("console", "log_f64", |mut caller: Caller<'_, HostState>, v: f64| {
        caller.data_mut().record(v.to_string());
    })?;

    linker.func_wrap(
        "process",
        "env",
        |mut caller: Caller<'_, HostState>,
         kptr: i32,
         klen: i32,
         buf: i32,
         cap: i32|
         -> wasmtime::Result<i32> {
            let key = read_string(&mut caller, kptr, klen)?;
            match caller.data().env.get(&key).cloned() {
                Some(value) => write_out(&mut caller, buf, cap, value.as_bytes()),
                None => Ok(-1),
            }
        },
    )?;
    linker.func_wrap(
        "process",
        "cwd",
        |mut caller: Caller<'_, HostState>, buf: i32, cap: i32| -> wasmtime::Result<i32> {
            let cwd = caller.data().cwd.clone();
            write_out(&mut caller, buf, cap, cwd.as_bytes())
        },
    )?;
    linker.func_wrap(
        "process",
        "exit",
        |_caller: Caller<'_, HostState>, code: i32| -> wasmtime::Result<()> {
            tracing::warn!(code, "Script attempted process.exit");
            Err(SandboxTrap::Violation(EXIT_NOT_ALLOWED.into()).into())
        },
    )?;

    linker.func_wrap("timers", "now", || chrono::Utc::now().timestamp_millis())?;
    linker.func_wrap_async(
        "timers",
        "sleep",
        |_caller: Caller<'_, HostState>, (ms,): (i64,)| {
            Box::new(async move {
                let ms = u64::try_from(ms).unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<(), wasmtime::Error>(())
            })
        },
    )?;

    linker.func_wrap(
        "result",
        "string",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<()> {
            let text = read_string(&mut caller, ptr, len)?;
            caller.data_mut().result = Some(ScriptValue::String(text));
            Ok(())
        },
    )?;
    linker.func_wrap(
        "result",
        "json",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<()> {
            let text = read_string(&mut caller, ptr, len)?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| SandboxTrap::Script(format!("result.json: invalid JSON: {e}")))?;
            caller.data_mut().result = Some(ScriptValue::Json(value));
            Ok(())
        },
    )?;

    Ok(())
}
