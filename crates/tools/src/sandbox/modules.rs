//! Script-to-script imports.
//!
//! An import whose module name is not a host namespace is a path to another
//! WAT/wasm file under the working root. Dependencies are resolved through
//! path confinement, compiled, and returned in post-order so every module is
//! instantiated after the modules it imports.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tether_security::{confine, display_path};
use wasmtime::{Engine, Module};

use super::SandboxError;
use super::host::{is_host_import, is_host_namespace};

pub(crate) const MAX_MODULE_DEPTH: usize = 8;

/// A compiled dependency and every specifier it was imported under.
pub(crate) struct LoadedModule {
    pub module: Module,
    pub specifiers: BTreeSet<String>,
}

pub(crate) fn compile(engine: &Engine, bytes: &[u8], label: &str) -> Result<Module, SandboxError> {
    let binary = wat::parse_bytes(bytes)
        .map_err(|e| SandboxError::Compile(format!("{label}: {e}")))?;
    Module::from_binary(engine, &binary).map_err(|e| SandboxError::Compile(format!("{label}: {e:#}")))
}

/// Reject imports from a host namespace that the host does not provide.
pub(crate) fn check_host_imports(module: &Module, label: &str) -> Result<(), SandboxError> {
    for import in module.imports() {
        if is_host_namespace(import.module()) && !is_host_import(import.module(), import.name()) {
            return Err(SandboxError::Violation(format!(
                "{label} imports {}.{}, which is not available inside the sandbox",
                import.module(),
                import.name()
            )));
        }
    }
    Ok(())
}

struct Loader<'a> {
    engine: &'a Engine,
    root: &'a Path,
    /// Canonical path → index into `order`.
    done: HashMap<PathBuf, usize>,
    order: Vec<LoadedModule>,
    /// Modules on the current DFS path, for cycle reporting.
    stack: Vec<PathBuf>,
}

/// Load every file-backed dependency of `entry`, dependencies first.
pub(crate) fn load_dependencies(
    engine: &Engine,
    entry: &Module,
    root: &Path,
) -> Result<Vec<LoadedModule>, SandboxError> {
    let mut loader = Loader {
        engine,
        root,
        done: HashMap::new(),
        order: Vec::new(),
        stack: Vec::new(),
    };
    loader.visit_imports(entry, 1)?;
    Ok(loader.order)
}

impl Loader<'_> {
    fn visit_imports(&mut self, module: &Module, depth: usize) -> Result<(), SandboxError> {
        let specifiers: BTreeSet<String> = module
            .imports()
            .map(|i| i.module())
            .filter(|m| !is_host_namespace(m))
            .map(str::to_string)
            .collect();

        for specifier in specifiers {
            self.visit(&specifier, depth)?;
        }
        Ok(())
    }

    fn visit(&mut self, specifier: &str, depth: usize) -> Result<(), SandboxError> {
        let path = confine(specifier, self.root)?;

        if self.stack.contains(&path) {
            let mut chain: Vec<String> = self
                .stack
                .iter()
                .skip_while(|p| **p != path)
                .map(|p| display_path(p, self.root))
                .collect();
            chain.push(display_path(&path, self.root));
            return Err(SandboxError::ModuleLoad {
                specifier: specifier.to_string(),
                reason: format!("import cycle: {}", chain.join(" -> ")),
            });
        }
        if let Some(&index) = self.done.get(&path) {
            self.order[index].specifiers.insert(specifier.to_string());
            return Ok(());
        }
        if depth > MAX_MODULE_DEPTH {
            return Err(SandboxError::ModuleLoad {
                specifier: specifier.to_string(),
                reason: format!("imports nested deeper than {MAX_MODULE_DEPTH} levels"),
            });
        }

        let bytes = std::fs::read(&path).map_err(|e| SandboxError::ModuleLoad {
            specifier: specifier.to_string(),
            reason: e.to_string(),
        })?;
        let label = display_path(&path, self.root);
        let module = compile(self.engine, &bytes, &label).map_err(|e| SandboxError::ModuleLoad {
            specifier: specifier.to_string(),
            reason: e.to_string(),
        })?;
        check_host_imports(&module, &label)?;

        self.stack.push(path.clone());
        self.visit_imports(&module, depth + 1)?;
        self.stack.pop();

        tracing::debug!(module = %label, depth, "Loaded script dependency");
        self.done.insert(path, self.order.len());
        self.order.push(LoadedModule {
            module,
            specifiers: BTreeSet::from([specifier.to_string()]),
        });
        Ok(())
    }
}
