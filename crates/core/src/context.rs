//! Execution context shared by every tool call in a run.
//!
//! Created once per run and handed to tools by shared reference. Fields are
//! private, so a tool can read the working root, the cancellation token, and
//! the environment overrides but never change them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Canonical confinement root.
    root: PathBuf,
    cancellation: CancellationToken,
    env: BTreeMap<String, String>,
}

impl ExecutionContext {
    /// Create a context rooted at `root` with a fresh cancellation token.
    ///
    /// The root is canonicalized here so every later confinement check
    /// compares against the same resolved path.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("working root {} is not a directory", root.display()),
            ));
        }
        Ok(Self {
            root,
            cancellation: CancellationToken::new(),
            env: BTreeMap::new(),
        })
    }

    /// Use `token` as this run's cancellation signal.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Add environment overrides visible to tools (and the script sandbox).
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// The canonical working root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Only the overrides supplied for this run.
    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Host environment merged with this run's overrides (overrides win).
    pub fn merged_env(&self) -> BTreeMap<String, String> {
        let mut merged: BTreeMap<String, String> = std::env::vars().collect();
        merged.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir(&nested).unwrap();

        let ctx = ExecutionContext::new(nested.join("..").join("a")).unwrap();
        assert_eq!(ctx.root(), nested.canonicalize().unwrap());
    }

    #[test]
    fn file_root_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(ExecutionContext::new(&file).is_err());
    }

    #[test]
    fn overrides_win_over_host_env() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::new(dir.path())
            .unwrap()
            .with_env([("PATH", "/sandbox/bin"), ("TETHER_TEST_ONLY", "1")]);

        let merged = ctx.merged_env();
        assert_eq!(merged.get("PATH").map(String::as_str), Some("/sandbox/bin"));
        assert_eq!(merged.get("TETHER_TEST_ONLY").map(String::as_str), Some("1"));
        assert_eq!(ctx.env_overrides().len(), 2);
    }

    #[test]
    fn clones_share_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::new(dir.path()).unwrap();
        let shared = ctx.clone();
        assert!(!shared.is_cancelled());
        ctx.cancellation().cancel();
        assert!(shared.is_cancelled());
    }
}
